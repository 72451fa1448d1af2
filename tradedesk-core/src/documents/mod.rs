//! Quotes and invoices: numbering, line items, totals and lifecycle.
//!
//! Both kinds share one storage model and one set of handlers; the kind is
//! injected into each router as an [`Extension`].

pub mod handlers;
pub mod normalize;
pub mod numbering;
pub mod service;
pub mod totals;
pub mod types;


use axum::{
    routing::{get, post, put},
    Extension, Router,
};

use crate::models::DocumentKind;
use crate::AppState;

pub use service::DocumentService;
pub use types::{CreateDocumentRequest, RawItem, RawNumber, ReplaceItemsRequest};

/// CRUD routes for one document kind, to be nested under `/api/<kind>s`.
pub fn routes(kind: DocumentKind) -> Router<AppState> {
    let router = Router::new()
        .route("/", post(handlers::create_document).get(handlers::list_documents))
        .route("/:id", get(handlers::get_document).delete(handlers::delete_document))
        .route("/:id/items", put(handlers::replace_items))
        .route("/:id/status", put(handlers::update_status));

    let router = match kind {
        DocumentKind::Quote => router.route("/:id/convert", post(handlers::convert_quote)),
        DocumentKind::Invoice => router,
    };

    router.layer(Extension(kind))
}
