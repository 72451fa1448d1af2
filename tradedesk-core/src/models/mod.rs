pub mod client;
pub mod document;
pub mod job;

pub use client::{Client, ClientSummary, CreateClient};
pub use document::{
    Document, DocumentKind, DocumentResponse, DocumentSummary, DocumentUpdate, DocumentWithItems,
    InvoiceStatus, LineItem, NewDocument, NewLineItem, QuoteStatus, Totals,
};
pub use job::{CreateJob, Job, JobStatus, UpdateJobStatus};
