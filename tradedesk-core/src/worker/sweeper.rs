use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{error, info};

use crate::error::AppError;
use crate::models::Document;
use crate::notify::{DomainEvent, EventPublisher};
use crate::store::{DocumentStore, Store};

/// Invoices handled per poll.
const SWEEP_BATCH_SIZE: i64 = 100;

/// Marks sent invoices past their due date as overdue.
///
/// Polls the store at a fixed interval and emits a payment reminder event
/// for every invoice it flags. Cloning shares the running flag, so a clone
/// can stop a sweeper started elsewhere.
#[derive(Clone)]
pub struct OverdueSweeper {
    store: Arc<dyn Store>,
    events: EventPublisher,
    poll_interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl OverdueSweeper {
    /// Creates a new overdue sweeper.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend queried for sent invoices past their due date
    /// * `events` - Publisher that receives one `InvoiceOverdue` per flagged invoice
    /// * `poll_interval_seconds` - Interval between sweeps (default: 60 seconds)
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, poll_interval_seconds: Option<u64>) -> Self {
        Self {
            store,
            events,
            poll_interval: Duration::from_secs(poll_interval_seconds.unwrap_or(60)),
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Runs until [`OverdueSweeper::stop`] is called. Errors of one poll are
    /// logged and the loop carries on.
    pub async fn start(&self) {
        *self.running.write().await = true;
        info!(
            "OverdueSweeper started with poll interval: {} seconds",
            self.poll_interval.as_secs()
        );

        while *self.running.read().await {
            match self.sweep_once(Utc::now().date_naive()).await {
                Ok(count) if count > 0 => info!("Flagged {} overdue invoice(s)", count),
                Ok(_) => {}
                Err(e) => error!("Error in sweeper loop: {}", e),
            }

            sleep(self.poll_interval).await;
        }

        info!("OverdueSweeper stopped");
    }

    pub async fn stop(&self) {
        info!("Stopping OverdueSweeper...");
        *self.running.write().await = false;
    }

    /// One pass over the invoices due before `today`. Returns how many were
    /// flagged.
    pub async fn sweep_once(&self, today: NaiveDate) -> Result<usize, AppError> {
        let invoices = self.store.overdue_invoices(today, SWEEP_BATCH_SIZE).await?;

        let mut flagged = 0;
        for invoice in invoices {
            match self.flag(&invoice).await {
                Ok(true) => flagged += 1,
                Ok(false) => {}
                Err(e) => error!("Failed to flag invoice {}: {}", invoice.number, e),
            }
        }

        Ok(flagged)
    }

    async fn flag(&self, invoice: &Document) -> Result<bool, AppError> {
        // Paid, cancelled or deleted since the query.
        if !self.store.mark_overdue(invoice.tenant_id, invoice.id).await? {
            return Ok(false);
        }

        if let Some(due_date) = invoice.due_date {
            self.events.publish(DomainEvent::InvoiceOverdue {
                tenant_id: invoice.tenant_id,
                invoice_id: invoice.id,
                number: invoice.number.clone(),
                due_date,
            });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentKind, NewDocument, NewLineItem, Totals};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn invoice(number: &str, due_date: NaiveDate, status: &str) -> NewDocument {
        NewDocument {
            kind: DocumentKind::Invoice,
            number: number.to_string(),
            tenant_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            issue_date: due_date,
            due_date: Some(due_date),
            tax_rate: Decimal::ZERO,
            totals: Totals {
                subtotal: Decimal::TEN,
                tax_amount: Decimal::ZERO,
                total: Decimal::TEN,
            },
            status: status.to_string(),
            notes: None,
            items: vec![NewLineItem {
                description: "Call-out".to_string(),
                quantity: 1,
                unit_price: Decimal::TEN,
                total: Decimal::TEN,
            }],
        }
    }

    #[tokio::test]
    async fn test_sweep_flags_only_sent_invoices_past_due() {
        let store = Arc::new(MemoryStore::new());
        let (events, mut receiver) = EventPublisher::channel();
        let today = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 7, 14).unwrap();

        let late = store.insert_document(invoice("FAC-000001", yesterday, "sent")).await.unwrap();
        store.insert_document(invoice("FAC-000002", today, "sent")).await.unwrap();
        store.insert_document(invoice("FAC-000003", yesterday, "paid")).await.unwrap();

        let sweeper = OverdueSweeper::new(store.clone(), events, Some(1));
        assert_eq!(sweeper.sweep_once(today).await.unwrap(), 1);

        let reloaded = store
            .find_document(late.document.tenant_id, DocumentKind::Invoice, late.document.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.document.status, "overdue");

        match receiver.try_recv().unwrap() {
            DomainEvent::InvoiceOverdue { number, .. } => assert_eq!(number, "FAC-000001"),
            other => panic!("unexpected event {:?}", other),
        }

        // already overdue, nothing left to flag
        assert_eq!(sweeper.sweep_once(today).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invoice_paid_after_the_query_is_left_alone() {
        let store = Arc::new(MemoryStore::new());
        let (events, mut receiver) = EventPublisher::channel();
        let today = NaiveDate::from_ymd_opt(2026, 7, 15).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2026, 7, 14).unwrap();

        let late = store.insert_document(invoice("FAC-000001", yesterday, "sent")).await.unwrap();
        let sweeper = OverdueSweeper::new(store.clone(), events, Some(1));

        let due = store.overdue_invoices(today, SWEEP_BATCH_SIZE).await.unwrap();
        assert_eq!(due.len(), 1);

        store
            .set_status(late.document.tenant_id, DocumentKind::Invoice, late.document.id, "paid")
            .await
            .unwrap()
            .unwrap();

        assert!(!sweeper.flag(&due[0]).await.unwrap());

        let reloaded = store
            .find_document(late.document.tenant_id, DocumentKind::Invoice, late.document.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.document.status, "paid");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_ends_the_loop() {
        let (events, _receiver) = EventPublisher::channel();
        let sweeper = OverdueSweeper::new(Arc::new(MemoryStore::new()), events, Some(1));

        let runner = sweeper.clone();
        let handle = tokio::spawn(async move { runner.start().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        sweeper.stop().await;

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
