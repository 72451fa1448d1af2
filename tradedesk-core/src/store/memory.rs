use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateJob, Document, DocumentKind, DocumentUpdate, DocumentWithItems,
    Job, JobStatus, LineItem, NewDocument, NewLineItem,
};
use crate::store::{ClientStore, DocumentStore, JobStore, Store, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    clients: HashMap<Uuid, Client>,
    documents: HashMap<Uuid, Document>,
    items: HashMap<Uuid, Vec<LineItem>>,
    jobs: HashMap<Uuid, Job>,
}

impl MemoryState {
    fn document(&self, tenant_id: Uuid, kind: DocumentKind, id: Uuid) -> Option<&Document> {
        self.documents
            .get(&id)
            .filter(|doc| doc.tenant_id == tenant_id && doc.kind == kind)
    }

    fn with_items(&self, document: &Document) -> DocumentWithItems {
        DocumentWithItems {
            document: document.clone(),
            items: self.items.get(&document.id).cloned().unwrap_or_default(),
        }
    }

    /// Same effect as the `UNIQUE (number)` constraint of the SQL schema.
    fn insert(&mut self, new: NewDocument) -> Result<DocumentWithItems, StoreError> {
        if self.documents.values().any(|doc| doc.number == new.number) {
            return Err(StoreError::DuplicateNumber(new.number));
        }

        let now = Utc::now();
        let document = Document {
            id: Uuid::new_v4(),
            kind: new.kind,
            number: new.number,
            tenant_id: new.tenant_id,
            client_id: new.client_id,
            issue_date: new.issue_date,
            due_date: new.due_date,
            subtotal: new.totals.subtotal,
            tax_rate: new.tax_rate,
            tax_amount: new.totals.tax_amount,
            total: new.totals.total,
            status: new.status,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let items = to_rows(document.id, new.items);
        self.items.insert(document.id, items.clone());
        self.documents.insert(document.id, document.clone());

        Ok(DocumentWithItems { document, items })
    }
}

fn to_rows(document_id: Uuid, items: Vec<NewLineItem>) -> Vec<LineItem> {
    items
        .into_iter()
        .enumerate()
        .map(|(position, item)| LineItem {
            id: Uuid::new_v4(),
            document_id,
            position: position as i32,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
        })
        .collect()
}

/// In-process store with the same semantics as [`crate::store::PgStore`].
///
/// Intended for tests and local runs without a database. One lock guards
/// all tables, so every method is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Number of stored line items across all documents.
    pub fn item_count(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.items.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn insert_client(&self, tenant_id: Uuid, client: CreateClient) -> Result<Client, StoreError> {
        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            tenant_id,
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            phone: client.phone,
            address: client.address,
            created_at: now,
            updated_at: now,
        };

        self.lock()?.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn find_client(&self, tenant_id: Uuid, client_id: Uuid) -> Result<Option<Client>, StoreError> {
        Ok(self
            .lock()?
            .clients
            .get(&client_id)
            .filter(|client| client.tenant_id == tenant_id)
            .cloned())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn tenant_numbers(&self, tenant_id: Uuid, kind: DocumentKind) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()?
            .documents
            .values()
            .filter(|doc| doc.tenant_id == tenant_id && doc.kind == kind)
            .map(|doc| doc.number.clone())
            .collect())
    }

    async fn number_exists(&self, number: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.documents.values().any(|doc| doc.number == number))
    }

    async fn insert_document(&self, document: NewDocument) -> Result<DocumentWithItems, StoreError> {
        self.lock()?.insert(document)
    }

    async fn find_document(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .document(tenant_id, kind, id)
            .map(|doc| state.with_items(doc)))
    }

    async fn list_documents(&self, tenant_id: Uuid, kind: DocumentKind) -> Result<Vec<Document>, StoreError> {
        let mut documents: Vec<Document> = self
            .lock()?
            .documents
            .values()
            .filter(|doc| doc.tenant_id == tenant_id && doc.kind == kind)
            .cloned()
            .collect();

        documents.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(documents)
    }

    async fn update_document(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let mut state = self.lock()?;
        if state.document(tenant_id, kind, id).is_none() {
            return Ok(None);
        }

        if let Some(items) = update.items {
            let rows = to_rows(id, items);
            state.items.insert(id, rows);
        }

        let document = match state.documents.get_mut(&id) {
            Some(doc) => {
                doc.tax_rate = update.tax_rate;
                doc.subtotal = update.totals.subtotal;
                doc.tax_amount = update.totals.tax_amount;
                doc.total = update.totals.total;
                doc.updated_at = Utc::now();
                doc.clone()
            }
            None => return Ok(None),
        };

        Ok(Some(state.with_items(&document)))
    }

    async fn set_status(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
        status: &str,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let mut state = self.lock()?;
        if state.document(tenant_id, kind, id).is_none() {
            return Ok(None);
        }

        let document = match state.documents.get_mut(&id) {
            Some(doc) => {
                doc.status = status.to_string();
                doc.updated_at = Utc::now();
                doc.clone()
            }
            None => return Ok(None),
        };

        Ok(Some(state.with_items(&document)))
    }

    async fn convert_quote(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        invoice: NewDocument,
    ) -> Result<Option<DocumentWithItems>, StoreError> {
        let mut state = self.lock()?;
        if state.document(tenant_id, DocumentKind::Quote, quote_id).is_none() {
            return Ok(None);
        }

        let created = state.insert(invoice)?;

        if let Some(quote) = state.documents.get_mut(&quote_id) {
            quote.status = "accepted".to_string();
            quote.updated_at = Utc::now();
        }

        Ok(Some(created))
    }

    async fn delete_document(&self, tenant_id: Uuid, kind: DocumentKind, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.document(tenant_id, kind, id).is_none() {
            return Ok(false);
        }

        state.documents.remove(&id);
        state.items.remove(&id);
        Ok(true)
    }

    async fn overdue_invoices(&self, today: NaiveDate, limit: i64) -> Result<Vec<Document>, StoreError> {
        let mut overdue: Vec<Document> = self
            .lock()?
            .documents
            .values()
            .filter(|doc| {
                doc.kind == DocumentKind::Invoice
                    && doc.status == "sent"
                    && doc.due_date.is_some_and(|due| due < today)
            })
            .cloned()
            .collect();

        overdue.sort_by_key(|doc| doc.due_date);
        overdue.truncate(limit.max(0) as usize);
        Ok(overdue)
    }

    async fn mark_overdue(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        match state.documents.get_mut(&id) {
            Some(doc)
                if doc.tenant_id == tenant_id
                    && doc.kind == DocumentKind::Invoice
                    && doc.status == "sent" =>
            {
                doc.status = "overdue".to_string();
                doc.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, tenant_id: Uuid, job: CreateJob) -> Result<Job, StoreError> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            tenant_id,
            client_id: job.client_id,
            title: job.title,
            scheduled_at: job.scheduled_at,
            status: JobStatus::Todo,
            notes: job.notes,
            created_at: now,
            updated_at: now,
        };

        self.lock()?.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, tenant_id: Uuid, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self
            .lock()?
            .jobs
            .get(&job_id)
            .filter(|job| job.tenant_id == tenant_id)
            .cloned())
    }

    async fn set_job_status(
        &self,
        tenant_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Option<Job>, StoreError> {
        let mut state = self.lock()?;
        match state.jobs.get_mut(&job_id) {
            Some(job) if job.tenant_id == tenant_id => {
                job.status = status;
                job.updated_at = Utc::now();
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
