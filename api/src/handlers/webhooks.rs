//! Webhook handlers
//!
//! Receives GitHub and GitLab webhook deliveries and verifies their
//! signatures with the cached adapter for that provider.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::Value;

use super::provider_from_path;
use crate::domain::entities::ProviderKind;
use crate::error::AppError;
use crate::AppState;

fn signature_header(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::GitHub => "X-Hub-Signature-256",
        ProviderKind::GitLab => "X-Gitlab-Signature",
    }
}

fn event_header(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::GitHub => "X-GitHub-Event",
        ProviderKind::GitLab => "X-Gitlab-Event",
    }
}

/// Repository named by a delivery, if the payload carries one
fn repository_name(kind: ProviderKind, body: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(body).ok()?;
    let name = match kind {
        ProviderKind::GitHub => &payload["repository"]["full_name"],
        ProviderKind::GitLab => &payload["project"]["path_with_namespace"],
    };
    name.as_str().map(str::to_string)
}

/// POST /api/webhooks/:provider
pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let kind = provider_from_path(&provider)?;

    let client = state
        .registry
        .cached(kind)
        .ok_or_else(|| AppError::Unavailable(format!("{} is not connected", kind)))?;

    let signature = headers
        .get(signature_header(kind))
        .and_then(|h| h.to_str().ok());
    let Some(signature) = signature else {
        tracing::warn!(provider = %kind, "Webhook without signature header");
        return Err(AppError::Unauthorized);
    };

    if !client.validate_webhook_payload(&body, signature)? {
        tracing::warn!(provider = %kind, "Webhook signature verification failed");
        return Err(AppError::Unauthorized);
    }

    let event_type = headers
        .get(event_header(kind))
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    tracing::info!(
        provider = %kind,
        event_type = event_type,
        repo = ?repository_name(kind, &body),
        bytes = body.len(),
        "Received webhook"
    );

    Ok(StatusCode::OK)
}
