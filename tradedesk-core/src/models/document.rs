use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::client::ClientSummary;

/// Kind of commercial document. Quotes and invoices share one table and
/// differ only by numbering prefix and status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    #[sqlx(rename = "quote")]
    Quote,
    #[sqlx(rename = "invoice")]
    Invoice,
}

impl DocumentKind {
    /// Prefix of the human-readable number (`DEV-000042`, `FAC-000042`).
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "DEV",
            DocumentKind::Invoice => "FAC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Quote => "quote",
            DocumentKind::Invoice => "invoice",
        }
    }

    /// Checks `status` against the kind's vocabulary and returns its
    /// canonical spelling.
    pub fn parse_status(&self, status: &str) -> Option<&'static str> {
        match self {
            DocumentKind::Quote => status.parse::<QuoteStatus>().ok().map(|s| s.as_str()),
            DocumentKind::Invoice => status.parse::<InvoiceStatus>().ok().map(|s| s.as_str()),
        }
    }

    /// Status every new document starts in.
    pub fn initial_status(&self) -> &'static str {
        "draft"
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quote lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
        }
    }
}

impl FromStr for QuoteStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(QuoteStatus::Draft),
            "sent" => Ok(QuoteStatus::Sent),
            "accepted" => Ok(QuoteStatus::Accepted),
            "rejected" => Ok(QuoteStatus::Rejected),
            "expired" => Ok(QuoteStatus::Expired),
            _ => Err(()),
        }
    }
}

/// Invoice lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// Document header as stored in the `documents` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    /// Unique identifier for the document
    pub id: Uuid,

    pub kind: DocumentKind,

    /// Human-readable number, unique across all tenants
    pub number: String,

    /// Owning tenant (business account)
    pub tenant_id: Uuid,

    pub client_id: Uuid,

    /// Date the document was issued
    pub issue_date: NaiveDate,

    /// Payment due date for invoices, validity end for quotes
    pub due_date: Option<NaiveDate>,

    pub subtotal: Decimal,

    /// Tax rate as a percentage (0-100)
    pub tax_rate: Decimal,

    pub tax_amount: Decimal,

    pub total: Decimal,

    /// Status, spelled from the kind's vocabulary
    pub status: String,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// One billable row of a document, as stored in `document_items`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LineItem {
    pub id: Uuid,
    pub document_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// A normalized line item that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Subtotal, tax and grand total of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

/// Everything needed to insert a document and its items in one go.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub number: String,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub tax_rate: Decimal,
    pub totals: Totals,
    pub status: String,
    pub notes: Option<String>,
    pub items: Vec<NewLineItem>,
}

/// Replacement applied by an items/totals update.
///
/// `items: None` leaves the stored rows untouched.
#[derive(Debug, Clone)]
pub struct DocumentUpdate {
    pub items: Option<Vec<NewLineItem>>,
    pub tax_rate: Decimal,
    pub totals: Totals,
}

/// A document header together with its ordered items.
#[derive(Debug, Clone)]
pub struct DocumentWithItems {
    pub document: Document,
    pub items: Vec<LineItem>,
}

/// Public representation of a line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemResponse {
    pub id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl From<LineItem> for LineItemResponse {
    fn from(item: LineItem) -> Self {
        LineItemResponse {
            id: item.id,
            position: item.position,
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
            total: item.total,
        }
    }
}

/// Document response (public representation).
///
/// The optional date is named `valid_until` on quotes and `due_date` on
/// invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub number: String,
    pub kind: DocumentKind,
    pub tenant_id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub status: String,
    pub items: Vec<LineItemResponse>,
    pub client: Option<ClientSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentResponse {
    pub fn new(document: DocumentWithItems, client: Option<ClientSummary>) -> Self {
        let DocumentWithItems { document: doc, items } = document;
        let (due_date, valid_until) = match doc.kind {
            DocumentKind::Quote => (None, doc.due_date),
            DocumentKind::Invoice => (doc.due_date, None),
        };

        DocumentResponse {
            id: doc.id,
            number: doc.number,
            kind: doc.kind,
            tenant_id: doc.tenant_id,
            client_id: doc.client_id,
            date: doc.issue_date,
            due_date,
            valid_until,
            subtotal: doc.subtotal,
            tax_rate: doc.tax_rate,
            tax_amount: doc.tax_amount,
            total: doc.total,
            notes: doc.notes,
            status: doc.status,
            items: items.into_iter().map(LineItemResponse::from).collect(),
            client,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

/// Row of a document listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub total: Decimal,
    pub status: String,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        DocumentSummary {
            id: doc.id,
            number: doc.number,
            client_id: doc.client_id,
            date: doc.issue_date,
            total: doc.total,
            status: doc.status,
        }
    }
}
