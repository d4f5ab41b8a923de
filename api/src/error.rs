//! Unified error types for the Shipyard API
//!
//! This module defines error types for each layer:
//! - `GitProviderError`: failures of a git provider adapter
//! - `OAuthError`: failures of the authorization-code exchange
//! - `AppError`: HTTP layer errors (wraps the above for responses)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::entities::ProviderKind;

/// Errors surfaced by git provider adapters
#[derive(Debug, Error)]
pub enum GitProviderError {
    #[error("{0} adapter used before initialize")]
    NotInitialized(ProviderKind),

    #[error("{0} adapter is already initialized")]
    AlreadyInitialized(ProviderKind),

    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Repository not found: {owner}/{repo}")]
    RepoNotFound { owner: String, repo: String },

    #[error("Webhook not found: {owner}/{repo} hook {id}")]
    WebhookNotFound {
        owner: String,
        repo: String,
        id: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Pagination link outside the API base: {0}")]
    ForeignLink(String),
}

impl GitProviderError {
    /// True for every "resource absent" variant
    pub fn is_not_found(&self) -> bool {
        match self {
            GitProviderError::RepoNotFound { .. }
            | GitProviderError::WebhookNotFound { .. }
            | GitProviderError::NotFound(_) => true,
            GitProviderError::Api { status, .. } => *status == 404,
            _ => false,
        }
    }

    /// Provider HTTP status behind this error, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GitProviderError::Api { status, .. } => Some(*status),
            GitProviderError::Unauthorized { .. } => Some(401),
            GitProviderError::RateLimited { .. } => Some(429),
            GitProviderError::RepoNotFound { .. }
            | GitProviderError::WebhookNotFound { .. }
            | GitProviderError::NotFound(_) => Some(404),
            GitProviderError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// OAuth authorization-code exchange errors
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Token endpoint returned {status}")]
    Status { status: u16 },

    #[error("{error}: {description}")]
    Provider { error: String, description: String },

    #[error("Provider returned no access token")]
    MissingToken,
}

/// Application layer errors - used by HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git provider error: {0}")]
    GitProvider(#[from] GitProviderError),

    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body for JSON responses
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::GitProvider(e) => {
                tracing::error!(status = ?e.status(), "Git provider error: {}", e);
                match e {
                    GitProviderError::Unauthorized { .. } => {
                        (StatusCode::UNAUTHORIZED, "Git provider rejected credentials", None)
                    }
                    GitProviderError::RateLimited { .. } => {
                        (StatusCode::TOO_MANY_REQUESTS, "Rate limited", None)
                    }
                    e if e.is_not_found() => {
                        (StatusCode::NOT_FOUND, "Git resource not found", Some(e.to_string()))
                    }
                    GitProviderError::Api { status, message } => {
                        let http_status = if *status == 403 {
                            StatusCode::FORBIDDEN
                        } else if *status == 422 {
                            StatusCode::UNPROCESSABLE_ENTITY
                        } else {
                            StatusCode::BAD_GATEWAY
                        };
                        (http_status, "Git provider error", Some(message.clone()))
                    }
                    GitProviderError::Request(_) => {
                        (StatusCode::BAD_GATEWAY, "Git provider unreachable", None)
                    }
                    GitProviderError::ForeignLink(_) => {
                        (StatusCode::BAD_GATEWAY, "Git provider error", None)
                    }
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "Git provider error", None),
                }
            }
            AppError::OAuth(e) => {
                tracing::warn!("OAuth error: {}", e);
                match e {
                    OAuthError::Provider { description, .. } => (
                        StatusCode::BAD_REQUEST,
                        "Failed to get access token",
                        Some(description.clone()),
                    ),
                    OAuthError::MissingToken | OAuthError::Status { .. } => {
                        (StatusCode::BAD_REQUEST, "Failed to get access token", None)
                    }
                    OAuthError::Request(_) => {
                        (StatusCode::BAD_GATEWAY, "OAuth provider unreachable", None)
                    }
                }
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "Bad request", Some(msg.clone()))
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", Some(msg.clone())),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable",
                Some(msg.clone()),
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            details,
        });

        (status, body).into_response()
    }
}
