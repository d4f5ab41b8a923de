//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod github;
pub mod gitlab;
pub mod http;
pub mod oauth;
pub mod signature;

pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use oauth::OAuthEndpoints;
pub use signature::WebhookSigner;
