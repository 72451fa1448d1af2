use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentTenant;
use crate::documents::types::{CreateDocumentRequest, DeleteResponse, ReplaceItemsRequest, UpdateStatusRequest};
use crate::error::AppError;
use crate::models::{DocumentKind, DocumentResponse, DocumentSummary};
use crate::AppState;

/// `POST /api/{quotes,invoices}`
pub async fn create_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    body: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let Json(request) = body?;
    info!("Create {} request for tenant {}", kind, tenant_id);

    let document = state.documents.create(kind, tenant_id, request).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// `GET /api/{quotes,invoices}`
pub async fn list_documents(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    Ok(Json(state.documents.list(kind, tenant_id).await?))
}

/// `GET /api/{quotes,invoices}/:id`
pub async fn get_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, AppError> {
    Ok(Json(state.documents.get(kind, tenant_id, id).await?))
}

/// `PUT /api/{quotes,invoices}/:id/items`
pub async fn replace_items(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
    body: Result<Json<ReplaceItemsRequest>, JsonRejection>,
) -> Result<Json<DocumentResponse>, AppError> {
    let Json(request) = body?;
    Ok(Json(state.documents.replace_items(kind, tenant_id, id, request).await?))
}

/// `PUT /api/{quotes,invoices}/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<DocumentResponse>, AppError> {
    let Json(request) = body?;
    Ok(Json(
        state
            .documents
            .update_status(kind, tenant_id, id, &request.status)
            .await?,
    ))
}

/// `POST /api/quotes/:id/convert`
pub async fn convert_quote(
    State(state): State<AppState>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    info!("Convert quote {} for tenant {}", id, tenant_id);
    let invoice = state.documents.convert_quote_to_invoice(tenant_id, id).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// `DELETE /api/{quotes,invoices}/:id`
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(kind): Extension<DocumentKind>,
    Extension(CurrentTenant(tenant_id)): Extension<CurrentTenant>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.documents.delete(kind, tenant_id, id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
