use std::future::Future;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::documents::normalize::normalize;
use crate::documents::numbering::{allocate, MAX_ALLOCATION_ATTEMPTS};
use crate::documents::totals::{aggregate, aggregate_line_totals};
use crate::documents::types::{CreateDocumentRequest, ReplaceItemsRequest, MAX_AMOUNT};
use crate::error::AppError;
use crate::models::{
    ClientSummary, DocumentKind, DocumentResponse, DocumentSummary, DocumentUpdate,
    DocumentWithItems, NewDocument, NewLineItem, Totals,
};
use crate::notify::{DomainEvent, EventPublisher};
use crate::store::{ClientStore, DocumentStore, Store, StoreError};

/// Every mutation of quotes and invoices goes through here.
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn Store>,
    events: EventPublisher,
}

impl DocumentService {
    /// Creates a new document service.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend holding clients, documents and their items
    /// * `events` - Publisher for status change and conversion events
    ///
    /// # Returns
    ///
    /// A service that can be cloned cheaply into every handler.
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    /// Creates a draft document from a fully validated request.
    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        kind: DocumentKind,
        tenant_id: Uuid,
        request: CreateDocumentRequest,
    ) -> Result<DocumentResponse, AppError> {
        request.validate()?;

        let client_id = request
            .client_id
            .ok_or_else(|| AppError::field("client_id", "Client is required"))?;
        let issue_date = request
            .date
            .ok_or_else(|| AppError::field("date", "Date is required"))?;

        let client = self
            .store
            .find_client(tenant_id, client_id)
            .await?
            .ok_or(AppError::NotFound("client"))?;

        let items = normalize(&request.items);
        let totals = aggregate(&items, request.tax_rate);
        check_bounds(&totals)?;

        let template = NewDocument {
            kind,
            number: String::new(),
            tenant_id,
            client_id,
            issue_date,
            due_date: request.due_date,
            tax_rate: request.tax_rate,
            totals,
            status: kind.initial_status().to_string(),
            notes: request.notes,
            items,
        };

        let created = self
            .with_fresh_number(kind, tenant_id, |number| {
                let store = Arc::clone(&self.store);
                let document = NewDocument {
                    number,
                    ..template.clone()
                };
                async move { store.insert_document(document).await }
            })
            .await?;

        info!(
            document_id = %created.document.id,
            number = %created.document.number,
            total = %created.document.total,
            "Document created"
        );

        Ok(DocumentResponse::new(created, Some(ClientSummary::from(client))))
    }

    pub async fn get(&self, kind: DocumentKind, tenant_id: Uuid, id: Uuid) -> Result<DocumentResponse, AppError> {
        let document = self.load(kind, tenant_id, id).await?;
        self.respond(tenant_id, document).await
    }

    pub async fn list(&self, kind: DocumentKind, tenant_id: Uuid) -> Result<Vec<DocumentSummary>, AppError> {
        let documents = self.store.list_documents(tenant_id, kind).await?;
        Ok(documents.into_iter().map(DocumentSummary::from).collect())
    }

    /// Replaces the item set and/or the totals of a document.
    ///
    /// Blank rows are dropped silently here, unlike on creation.
    #[instrument(skip(self, request))]
    pub async fn replace_items(
        &self,
        kind: DocumentKind,
        tenant_id: Uuid,
        id: Uuid,
        request: ReplaceItemsRequest,
    ) -> Result<DocumentResponse, AppError> {
        request.validate()?;

        let current = self.load(kind, tenant_id, id).await?;
        let stored = &current.document;
        let tax_rate = request.tax_rate.unwrap_or(stored.tax_rate);

        let update = match request.items.as_deref() {
            Some(raw_items) if request.has_items() => {
                let items = normalize(raw_items);
                if items.is_empty() {
                    return Err(AppError::field(
                        "items",
                        "At least one item with a description is required",
                    ));
                }
                let totals = aggregate(&items, tax_rate);
                check_bounds(&totals)?;
                DocumentUpdate {
                    items: Some(items),
                    tax_rate,
                    totals,
                }
            }
            _ if request.has_explicit_totals() => DocumentUpdate {
                items: None,
                tax_rate,
                totals: Totals {
                    subtotal: request.subtotal.unwrap_or(stored.subtotal),
                    tax_amount: request.tax_amount.unwrap_or(stored.tax_amount),
                    total: request.total.unwrap_or(stored.total),
                },
            },
            _ if request.tax_rate.is_some() => {
                let totals = aggregate_line_totals(current.items.iter().map(|item| item.total), tax_rate);
                check_bounds(&totals)?;
                DocumentUpdate {
                    items: None,
                    tax_rate,
                    totals,
                }
            }
            _ => return Err(AppError::field("items", "Nothing to update")),
        };

        let updated = self
            .store
            .update_document(tenant_id, kind, id, update)
            .await?
            .ok_or(AppError::NotFound(kind.as_str()))?;

        info!(
            number = %updated.document.number,
            items = updated.items.len(),
            total = %updated.document.total,
            "Document items replaced"
        );

        self.respond(tenant_id, updated).await
    }

    /// Sets any status of the kind's vocabulary. There is no transition table.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        kind: DocumentKind,
        tenant_id: Uuid,
        id: Uuid,
        status: &str,
    ) -> Result<DocumentResponse, AppError> {
        let status = kind
            .parse_status(status)
            .ok_or_else(|| AppError::field("status", format!("Unknown {} status '{}'", kind, status)))?;

        let updated = self
            .store
            .set_status(tenant_id, kind, id, status)
            .await?
            .ok_or(AppError::NotFound(kind.as_str()))?;

        info!(number = %updated.document.number, status, "Document status changed");
        self.events.publish(DomainEvent::DocumentStatusChanged {
            tenant_id,
            kind,
            document_id: updated.document.id,
            number: updated.document.number.clone(),
            status: status.to_string(),
        });

        self.respond(tenant_id, updated).await
    }

    /// Copies a quote into a new draft invoice and marks the quote accepted.
    ///
    /// Totals are copied as stored, not recomputed.
    #[instrument(skip(self))]
    pub async fn convert_quote_to_invoice(&self, tenant_id: Uuid, quote_id: Uuid) -> Result<DocumentResponse, AppError> {
        let DocumentWithItems { document: quote, items } = self.load(DocumentKind::Quote, tenant_id, quote_id).await?;

        let template = NewDocument {
            kind: DocumentKind::Invoice,
            number: String::new(),
            tenant_id,
            client_id: quote.client_id,
            issue_date: quote.issue_date,
            due_date: None,
            tax_rate: quote.tax_rate,
            totals: Totals {
                subtotal: quote.subtotal,
                tax_amount: quote.tax_amount,
                total: quote.total,
            },
            status: DocumentKind::Invoice.initial_status().to_string(),
            notes: quote.notes.clone(),
            items: items
                .into_iter()
                .map(|item| NewLineItem {
                    description: item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total: item.total,
                })
                .collect(),
        };

        let invoice = self
            .with_fresh_number(DocumentKind::Invoice, tenant_id, |number| {
                let store = Arc::clone(&self.store);
                let invoice = NewDocument {
                    number,
                    ..template.clone()
                };
                async move { store.convert_quote(tenant_id, quote_id, invoice).await }
            })
            .await?
            .ok_or(AppError::NotFound("quote"))?;

        info!(
            quote = %quote.number,
            invoice = %invoice.document.number,
            "Quote converted"
        );
        self.events.publish(DomainEvent::QuoteConverted {
            tenant_id,
            quote_id,
            invoice_id: invoice.document.id,
            invoice_number: invoice.document.number.clone(),
        });

        self.respond(tenant_id, invoice).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, kind: DocumentKind, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_document(tenant_id, kind, id).await? {
            return Err(AppError::NotFound(kind.as_str()));
        }
        info!("Document deleted");
        Ok(())
    }

    async fn load(&self, kind: DocumentKind, tenant_id: Uuid, id: Uuid) -> Result<DocumentWithItems, AppError> {
        self.store
            .find_document(tenant_id, kind, id)
            .await?
            .ok_or(AppError::NotFound(kind.as_str()))
    }

    async fn respond(&self, tenant_id: Uuid, document: DocumentWithItems) -> Result<DocumentResponse, AppError> {
        let client = self
            .store
            .find_client(tenant_id, document.document.client_id)
            .await?
            .map(ClientSummary::from);
        Ok(DocumentResponse::new(document, client))
    }

    /// Runs `insert` with freshly allocated numbers until the store accepts one.
    ///
    /// Each lost race costs one attempt, and `n` concurrent creators can need
    /// up to `n` reallocations.
    async fn with_fresh_number<T, F, Fut>(
        &self,
        kind: DocumentKind,
        tenant_id: Uuid,
        mut insert: F,
    ) -> Result<T, AppError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let number = allocate(self.store.as_ref(), kind, tenant_id).await?;
            match insert(number).await {
                Ok(created) => return Ok(created),
                Err(StoreError::DuplicateNumber(number)) => {
                    warn!(%number, attempt, "Document number taken concurrently, reallocating");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::SequencingExhausted(kind))
    }
}

fn check_bounds(totals: &Totals) -> Result<(), AppError> {
    if totals.total > MAX_AMOUNT {
        return Err(AppError::field(
            "items",
            "Document total exceeds 999999999999.99",
        ));
    }
    Ok(())
}
