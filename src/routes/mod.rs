use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub mod channels;
pub mod donations;
pub mod receipts;

/// API routes without the transport layers `main` adds on top.
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/health", get(health_check))
        .route("/api/channels", get(channels::list_channels))
        .route("/api/receipts/ocr", post(receipts::ocr_receipt))
        .route("/api/donations", post(donations::create_donation))
        .route("/api/donations/{id}", get(donations::get_donation))
        .route("/api/donations/{id}/status", put(donations::update_status))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
