//! Test fixtures
//!
//! Factory functions for creating test configuration with sensible defaults.

use crate::adapters::OAuthEndpoints;
use crate::config::{Config, OAuthApp};
use crate::domain::entities::{Credential, ProviderConfig, ProviderKind};

/// Token every fake provider accepts
pub const TEST_TOKEN: &str = "test-token";
/// Tokens the fake OAuth endpoints hand out for `GOOD_CODE`
pub const GITHUB_EXCHANGED_TOKEN: &str = "gho_exchanged";
pub const GITLAB_EXCHANGED_TOKEN: &str = "glpat_exchanged";
pub const GOOD_CODE: &str = "good-code";
pub const WEBHOOK_SECRET: &str = "It's a Secret to Everybody";

/// Provider config still carrying the OAuth client secret
pub fn provider_config(kind: ProviderKind, api_url: &str) -> ProviderConfig {
    ProviderConfig {
        client_id: "test-client-id".to_string(),
        credential: Credential::ClientSecret("test-client-secret".to_string()),
        redirect_uri: format!("http://localhost:8080/api/auth/{}/callback", kind),
        scopes: vec!["repo".to_string(), "read:user".to_string()],
        api_url: api_url.to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    }
}

/// Provider config after a successful code exchange
pub fn access_token_config(kind: ProviderKind, api_url: &str) -> ProviderConfig {
    provider_config(kind, api_url).with_access_token(TEST_TOKEN)
}

pub fn oauth_endpoints(github_url: &str, gitlab_url: &str) -> OAuthEndpoints {
    OAuthEndpoints {
        github_url: github_url.to_string(),
        gitlab_url: gitlab_url.to_string(),
    }
}

fn oauth_app(prefix: &str) -> OAuthApp {
    OAuthApp {
        client_id: Some(format!("{}-client-id", prefix)),
        client_secret: Some(format!("{}-client-secret", prefix)),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    }
}

/// Process config with both providers pointed at one fake server
pub fn test_config(provider_base: &str) -> Config {
    Config {
        app_url: "http://localhost:8080".to_string(),
        port: 8080,
        github: oauth_app("github"),
        github_api_url: provider_base.to_string(),
        github_url: provider_base.to_string(),
        gitlab: oauth_app("gitlab"),
        gitlab_url: provider_base.to_string(),
    }
}
