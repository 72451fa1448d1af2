//! Domain events and their asynchronous delivery.
//!
//! Mutations publish events on an unbounded channel and return right away.
//! A background task hands each event to a [`NotificationSink`]; delivery
//! failures are logged and dropped.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{DocumentKind, JobStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    DocumentStatusChanged {
        tenant_id: Uuid,
        kind: DocumentKind,
        document_id: Uuid,
        number: String,
        status: String,
    },
    QuoteConverted {
        tenant_id: Uuid,
        quote_id: Uuid,
        invoice_id: Uuid,
        invoice_number: String,
    },
    JobStatusChanged {
        tenant_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
    },
    /// Payment reminder for an invoice past its due date.
    InvoiceOverdue {
        tenant_id: Uuid,
        invoice_id: Uuid,
        number: String,
        due_date: NaiveDate,
    },
}

impl DomainEvent {
    pub fn tenant_id(&self) -> Uuid {
        match self {
            DomainEvent::DocumentStatusChanged { tenant_id, .. }
            | DomainEvent::QuoteConverted { tenant_id, .. }
            | DomainEvent::JobStatusChanged { tenant_id, .. }
            | DomainEvent::InvoiceOverdue { tenant_id, .. } => *tenant_id,
        }
    }
}

/// Sending half handed to services.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: Option<mpsc::UnboundedSender<DomainEvent>>,
}

impl EventPublisher {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    /// Publisher that drops every event.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Never fails the caller. A closed channel only produces a warning.
    pub fn publish(&self, event: DomainEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        if let Err(err) = sender.send(event) {
            warn!(event = ?err.0, "Notifier is gone, event dropped");
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Destination of domain events (email, SMS, webhook...).
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn deliver(&self, event: &DomainEvent) -> Result<(), DeliveryError>;
}

/// Writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, event: &DomainEvent) -> Result<(), DeliveryError> {
        match event {
            DomainEvent::InvoiceOverdue { number, due_date, .. } => {
                info!(tenant_id = %event.tenant_id(), "Payment reminder: invoice {} was due on {}", number, due_date);
            }
            other => {
                info!(tenant_id = %event.tenant_id(), event = ?other, "Domain event");
            }
        }
        Ok(())
    }
}

/// Drains `receiver` into `sink` until every publisher is dropped.
pub fn spawn_notifier<S>(mut receiver: mpsc::UnboundedReceiver<DomainEvent>, sink: S) -> JoinHandle<()>
where
    S: NotificationSink,
{
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(err) = sink.deliver(&event).await {
                warn!(tenant_id = %event.tenant_id(), "{}", err);
            }
        }
        info!("Notifier stopped");
    })
}
