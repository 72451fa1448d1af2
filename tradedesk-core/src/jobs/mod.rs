//! Scheduled on-site jobs and their date-gated status changes.

pub mod gating;
pub mod service;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Extension, Router,
};
use uuid::Uuid;

use crate::auth::CurrentTenant;
use crate::error::AppError;
use crate::models::{CreateJob, Job, UpdateJobStatus};
use crate::AppState;

pub use service::JobService;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_job))
        .route("/:id", get(get_job))
        .route("/:id/status", put(update_job_status))
}

async fn create_job(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    body: Result<Json<CreateJob>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let Json(request) = body?;
    let job = state.jobs.create(tenant_id, request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn get_job(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    Ok(Json(state.jobs.get(tenant_id, id).await?))
}

async fn update_job_status(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateJobStatus>, JsonRejection>,
) -> Result<Json<Job>, AppError> {
    let Json(request) = body?;
    Ok(Json(state.jobs.update_status(tenant_id, id, request.status).await?))
}
