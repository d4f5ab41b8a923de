//! Router assembly
//!
//! Routes are returned without state or middleware so `main` can layer rate
//! limiting onto the OAuth group alone.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::AppState;

/// Health check and webhook receiver (signature-verified, no rate limit)
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/webhooks/:provider", post(handlers::receive_webhook))
}

/// OAuth connect flow
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/:provider", get(handlers::authorize))
        .route("/api/auth/:provider/callback", get(handlers::callback))
}
