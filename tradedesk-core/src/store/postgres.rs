use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateJob, Document, DocumentKind, DocumentUpdate, DocumentWithItems,
    Job, JobStatus, LineItem, NewDocument, NewLineItem,
};
use crate::store::{ClientStore, DocumentStore, JobStore, Store, StoreError};

/// PostgreSQL backend. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a unique violation on `documents.number` to [`StoreError::DuplicateNumber`].
fn map_insert_error(err: sqlx::Error, number: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::DuplicateNumber(number.to_string());
        }
    }
    StoreError::Database(err)
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    items: &[NewLineItem],
) -> Result<Vec<LineItem>, StoreError> {
    let mut rows = Vec::with_capacity(items.len());

    for (position, item) in items.iter().enumerate() {
        let row = sqlx::query_as::<_, LineItem>(
            r#"
            INSERT INTO document_items (id, document_id, position, description, quantity, unit_price, total)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, document_id, position, description, quantity, unit_price, total
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(document_id)
        .bind(position as i32)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.total)
        .fetch_one(&mut **tx)
        .await?;

        rows.push(row);
    }

    Ok(rows)
}

async fn insert_document_tx(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewDocument,
) -> Result<DocumentWithItems, StoreError> {
    let document = sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents (
            id, kind, number, tenant_id, client_id, issue_date, due_date,
            subtotal, tax_rate, tax_amount, total, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.kind)
    .bind(&new.number)
    .bind(new.tenant_id)
    .bind(new.client_id)
    .bind(new.issue_date)
    .bind(new.due_date)
    .bind(new.totals.subtotal)
    .bind(new.tax_rate)
    .bind(new.totals.tax_amount)
    .bind(new.totals.total)
    .bind(&new.status)
    .bind(&new.notes)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_insert_error(e, &new.number))?;

    let items = insert_items(tx, document.id, &new.items).await?;

    Ok(DocumentWithItems { document, items })
}

impl PgStore {
    async fn load_items(&self, document_id: Uuid) -> Result<Vec<LineItem>, StoreError> {
        let items = sqlx::query_as::<_, LineItem>(
            "SELECT * FROM document_items WHERE document_id = $1 ORDER BY position",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

#[async_trait]
impl ClientStore for PgStore {
    #[instrument(skip(self, client))]
    async fn insert_client(&self, tenant_id: Uuid, client: CreateClient) -> Result<Client, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (id, tenant_id, first_name, last_name, email, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .fetch_one(&self.pool)
        .await?;

        info!(client_id = %client.id, "Client created");
        Ok(client)
    }

    async fn find_client(&self, tenant_id: Uuid, client_id: Uuid) -> Result<Option<Client>, StoreError> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT * FROM clients WHERE id = $1 AND tenant_id = $2",
        )
        .bind(client_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(client)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn tenant_numbers(&self, tenant_id: Uuid, kind: DocumentKind) -> Result<Vec<String>, StoreError> {
        let numbers = sqlx::query_scalar::<_, String>(
            "SELECT number FROM documents WHERE tenant_id = $1 AND kind = $2",
        )
        .bind(tenant_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(numbers)
    }

    async fn number_exists(&self, number: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM documents WHERE number = $1)",
        )
        .bind(number)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    #[instrument(skip(self, document), fields(number = %document.number))]
    async fn insert_document(&self, document: NewDocument) -> Result<DocumentWithItems, StoreError> {
        let mut tx = self.pool.begin().await?;
        let created = insert_document_tx(&mut tx, &document).await?;
        tx.commit().await?;

        info!(
            document_id = %created.document.id,
            items = created.items.len(),
            "Document created"
        );
        Ok(created)
    }

    async fn find_document(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let document = sqlx::query_as::<_, Document>(
            "SELECT * FROM documents WHERE id = $1 AND tenant_id = $2 AND kind = $3",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        match document {
            Some(document) => {
                let items = self.load_items(document.id).await?;
                Ok(Some(DocumentWithItems { document, items }))
            }
            None => Ok(None),
        }
    }

    async fn list_documents(&self, tenant_id: Uuid, kind: DocumentKind) -> Result<Vec<Document>, StoreError> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE tenant_id = $1 AND kind = $2
            ORDER BY issue_date DESC, created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    #[instrument(skip(self, update))]
    async fn update_document(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let document = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents
            SET tax_rate = $4, subtotal = $5, tax_amount = $6, total = $7, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND kind = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(kind)
        .bind(update.tax_rate)
        .bind(update.totals.subtotal)
        .bind(update.totals.tax_amount)
        .bind(update.totals.total)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(document) = document else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(items) = &update.items {
            sqlx::query("DELETE FROM document_items WHERE document_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            insert_items(&mut tx, id, items).await?;
        }

        tx.commit().await?;

        let items = self.load_items(id).await?;
        Ok(Some(DocumentWithItems { document, items }))
    }

    async fn set_status(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
        status: &str,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            UPDATE documents SET status = $4, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND kind = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(kind)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        match document {
            Some(document) => {
                let items = self.load_items(document.id).await?;
                Ok(Some(DocumentWithItems { document, items }))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, invoice), fields(number = %invoice.number))]
    async fn convert_quote(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        invoice: NewDocument,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Locks the quote row until commit.
        let accepted = sqlx::query(
            r#"
            UPDATE documents SET status = 'accepted', updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND kind = 'quote'
            "#,
        )
        .bind(quote_id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?;

        if accepted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let created = insert_document_tx(&mut tx, &invoice).await?;
        tx.commit().await?;

        info!(
            invoice_id = %created.document.id,
            %quote_id,
            "Quote converted to invoice"
        );
        Ok(Some(created))
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, tenant_id: Uuid, kind: DocumentKind, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1 AND tenant_id = $2 AND kind = $3")
            .bind(id)
            .bind(tenant_id)
            .bind(kind)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!("Delete matched no document");
            return Ok(false);
        }
        Ok(true)
    }

    async fn overdue_invoices(&self, today: NaiveDate, limit: i64) -> Result<Vec<Document>, StoreError> {
        let documents = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE kind = 'invoice' AND status = 'sent' AND due_date < $1
            ORDER BY due_date
            LIMIT $2
            "#,
        )
        .bind(today)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    async fn mark_overdue(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET status = 'overdue', updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND kind = 'invoice' AND status = 'sent'
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl JobStore for PgStore {
    #[instrument(skip(self, job))]
    async fn insert_job(&self, tenant_id: Uuid, job: CreateJob) -> Result<Job, StoreError> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs (id, tenant_id, client_id, title, scheduled_at, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(job.client_id)
        .bind(&job.title)
        .bind(job.scheduled_at)
        .bind(JobStatus::Todo)
        .bind(&job.notes)
        .fetch_one(&self.pool)
        .await?;

        info!(job_id = %job.id, "Job created");
        Ok(job)
    }

    async fn find_job(&self, tenant_id: Uuid, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 AND tenant_id = $2")
            .bind(job_id)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn set_job_status(
        &self,
        tenant_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs SET status = $3, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(tenant_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
