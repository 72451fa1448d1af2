use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::jobs::gating::check_status_change;
use crate::models::{CreateJob, Job, JobStatus};
use crate::notify::{DomainEvent, EventPublisher};
use crate::store::{ClientStore, JobStore, Store};

#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn Store>,
    events: EventPublisher,
}

impl JobService {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, tenant_id: Uuid, request: CreateJob) -> Result<Job, AppError> {
        request.validate()?;

        if let Some(client_id) = request.client_id {
            self.store
                .find_client(tenant_id, client_id)
                .await?
                .ok_or(AppError::NotFound("client"))?;
        }

        let job = self.store.insert_job(tenant_id, request).await?;
        info!(job_id = %job.id, scheduled_at = %job.scheduled_at, "Job scheduled");
        Ok(job)
    }

    pub async fn get(&self, tenant_id: Uuid, job_id: Uuid) -> Result<Job, AppError> {
        self.store
            .find_job(tenant_id, job_id)
            .await?
            .ok_or(AppError::NotFound("job"))
    }

    /// Date-gated status change, judged against today's UTC date.
    pub async fn update_status(&self, tenant_id: Uuid, job_id: Uuid, status: JobStatus) -> Result<Job, AppError> {
        self.update_status_on(tenant_id, job_id, status, Utc::now().date_naive())
            .await
    }

    #[instrument(skip(self))]
    pub async fn update_status_on(
        &self,
        tenant_id: Uuid,
        job_id: Uuid,
        status: JobStatus,
        today: NaiveDate,
    ) -> Result<Job, AppError> {
        let job = self.get(tenant_id, job_id).await?;
        check_status_change(job.scheduled_at.date_naive(), today, status)?;

        let job = self
            .store
            .set_job_status(tenant_id, job_id, status)
            .await?
            .ok_or(AppError::NotFound("job"))?;

        info!(status = %job.status, "Job status changed");
        self.events.publish(DomainEvent::JobStatusChanged {
            tenant_id,
            job_id,
            status,
        });
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn service() -> (JobService, tokio::sync::mpsc::UnboundedReceiver<DomainEvent>) {
        let (events, receiver) = EventPublisher::channel();
        (JobService::new(Arc::new(MemoryStore::new()), events), receiver)
    }

    fn job_on(day: u32) -> CreateJob {
        CreateJob {
            title: "Boiler service".to_string(),
            client_id: None,
            scheduled_at: Utc.with_ymd_and_hms(2026, 6, day, 9, 30, 0).unwrap(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_status_change_is_gated_and_published() {
        let (service, mut receiver) = service();
        let tenant = Uuid::new_v4();
        let job = service.create(tenant, job_on(10)).await.unwrap();
        assert_eq!(job.status, JobStatus::Todo);

        let today = NaiveDate::from_ymd_opt(2026, 6, 9).unwrap();
        let err = service
            .update_status_on(tenant, job.id, JobStatus::Completed, today)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = service
            .update_status_on(tenant, job.id, JobStatus::InProgress, today)
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::InProgress);
        assert_eq!(
            receiver.try_recv().unwrap(),
            DomainEvent::JobStatusChanged {
                tenant_id: tenant,
                job_id: job.id,
                status: JobStatus::InProgress,
            }
        );
    }

    #[tokio::test]
    async fn test_other_tenant_sees_not_found() {
        let (service, _receiver) = service();
        let job = service.create(Uuid::new_v4(), job_on(10)).await.unwrap();

        let err = service.get(Uuid::new_v4(), job.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("job")));
    }

    #[tokio::test]
    async fn test_unknown_client_is_rejected() {
        let (service, _receiver) = service();
        let request = CreateJob {
            client_id: Some(Uuid::new_v4()),
            ..job_on(10)
        };

        let err = service.create(Uuid::new_v4(), request).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("client")));
    }
}
