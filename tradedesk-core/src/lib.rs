//! Back-office core for trades businesses: clients, numbered quotes and
//! invoices with computed totals, and scheduled jobs.

pub mod auth;
pub mod clients;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod store;
pub mod worker;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, middleware, response::Json, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::documents::DocumentService;
use crate::jobs::JobService;
use crate::models::DocumentKind;
use crate::notify::EventPublisher;
use crate::store::{MemoryStore, Store};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub documents: DocumentService,
    pub jobs: JobService,
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: EventPublisher, jwt_secret: &str) -> Self {
        Self {
            documents: DocumentService::new(Arc::clone(&store), events.clone()),
            jobs: JobService::new(Arc::clone(&store), events),
            store,
            jwt_secret: Arc::from(jwt_secret),
        }
    }

    /// State over an empty [`MemoryStore`] with notifications disabled.
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self::new(Arc::new(MemoryStore::new()), EventPublisher::disabled(), jwt_secret)
    }
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tradedesk-core",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Verifies the store answers.
async fn db_health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    state.store.ping().await.map_err(|e| {
        error!("Database health check failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "database": "connected"
    })))
}

/// Creates the application router.
///
/// Everything under `/api` requires a bearer token whose subject is the
/// tenant id. `/health` and `/health/db` are public.
///
/// # Arguments
///
/// * `state` - Shared application state (store, services, JWT secret)
///
/// # Returns
///
/// Returns a configured Axum router with tracing and CORS layers applied.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/clients", clients::routes())
        .nest("/quotes", documents::routes(DocumentKind::Quote))
        .nest("/invoices", documents::routes(DocumentKind::Invoice))
        .nest("/jobs", jobs::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/db", get(db_health_check))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
