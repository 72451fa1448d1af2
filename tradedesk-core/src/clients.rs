//! Client records that documents and jobs are addressed to.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentTenant;
use crate::error::AppError;
use crate::models::{Client, CreateClient};
use crate::store::ClientStore;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_client))
        .route("/:id", get(get_client))
}

async fn create_client(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    body: Result<Json<CreateClient>, JsonRejection>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let Json(request) = body?;
    request.validate()?;

    let client = state.store.insert_client(tenant_id, request).await?;
    info!("Client {} created for tenant {}", client.id, tenant_id);
    Ok((StatusCode::CREATED, Json(client)))
}

async fn get_client(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .store
        .find_client(tenant_id, id)
        .await?
        .ok_or(AppError::NotFound("client"))?;
    Ok(Json(client))
}
