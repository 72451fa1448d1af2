//! Persistence behind the document engine.
//!
//! Every query is scoped by the tenant id resolved from the caller's token,
//! except the global number check and the overdue sweep.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Client, CreateClient, CreateJob, Document, DocumentKind, DocumentUpdate, DocumentWithItems,
    Job, JobStatus, NewDocument,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique constraint on document numbers rejected an insert.
    #[error("document number {0} is already taken")]
    DuplicateNumber(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn insert_client(&self, tenant_id: Uuid, client: CreateClient) -> Result<Client, StoreError>;

    async fn find_client(&self, tenant_id: Uuid, client_id: Uuid) -> Result<Option<Client>, StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Numbers of the tenant's documents of one kind.
    async fn tenant_numbers(&self, tenant_id: Uuid, kind: DocumentKind) -> Result<Vec<String>, StoreError>;

    /// Whether any document of any tenant already carries `number`.
    async fn number_exists(&self, number: &str) -> Result<bool, StoreError>;

    /// Inserts a document and its items atomically.
    async fn insert_document(&self, document: NewDocument) -> Result<DocumentWithItems, StoreError>;

    async fn find_document(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
    ) -> Result<Option<DocumentWithItems>, StoreError>;

    /// Headers only, newest first.
    async fn list_documents(&self, tenant_id: Uuid, kind: DocumentKind) -> Result<Vec<Document>, StoreError>;

    /// Replaces items (when given) and stores the new tax rate and totals.
    async fn update_document(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Option<DocumentWithItems>, StoreError>;

    async fn set_status(
        &self,
        tenant_id: Uuid,
        kind: DocumentKind,
        id: Uuid,
        status: &str,
    ) -> Result<Option<DocumentWithItems>, StoreError>;

    /// Inserts `invoice` and marks the quote accepted in one transaction.
    /// Returns `None`, with nothing written, when the quote is gone.
    async fn convert_quote(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        invoice: NewDocument,
    ) -> Result<Option<DocumentWithItems>, StoreError>;

    /// Deletes a document and its items. `false` when nothing matched.
    async fn delete_document(&self, tenant_id: Uuid, kind: DocumentKind, id: Uuid) -> Result<bool, StoreError>;

    /// Sent invoices of all tenants whose due date is before `today`.
    async fn overdue_invoices(&self, today: NaiveDate, limit: i64) -> Result<Vec<Document>, StoreError>;

    /// Moves an invoice from `sent` to `overdue`. `false` when the invoice is
    /// gone or no longer `sent`.
    async fn mark_overdue(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert_job(&self, tenant_id: Uuid, job: CreateJob) -> Result<Job, StoreError>;

    async fn find_job(&self, tenant_id: Uuid, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn set_job_status(
        &self,
        tenant_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
    ) -> Result<Option<Job>, StoreError>;
}

/// Everything the service needs from a backend.
#[async_trait]
pub trait Store: ClientStore + DocumentStore + JobStore {
    /// Cheap round-trip used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
