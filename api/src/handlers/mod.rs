//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod health;
pub mod oauth;
pub mod webhooks;

pub use health::health;
pub use oauth::{authorize, callback};
pub use webhooks::receive_webhook;

use crate::domain::entities::ProviderKind;
use crate::error::AppError;

/// Parse the `:provider` path segment
pub(crate) fn provider_from_path(raw: &str) -> Result<ProviderKind, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Unknown provider: {}", raw)))
}
