// src/server/mod.rs

mod error;
mod handlers;

pub(crate) use handlers::validate_content_type;
pub use handlers::{ApiStatus, UploadResponse};

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::UploadSection;
use crate::pipeline::InvoicePipeline;

/// Shared, read-only state of the HTTP surface.
pub struct AppState {
    pub pipeline: InvoicePipeline,
    pub upload: UploadSection,
    pub api_status: ApiStatus,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/test", get(handlers::test))
        .route("/api-status", get(handlers::api_status))
        .route("/upload-invoice", post(handlers::upload_invoice))
        .layer(DefaultBodyLimit::max(state.upload.max_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
