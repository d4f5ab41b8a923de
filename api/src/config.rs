use std::env;

use crate::adapters::OAuthEndpoints;
use crate::domain::entities::{Credential, ProviderConfig, ProviderKind};

const GITHUB_SCOPES: &[&str] = &[
    "repo",
    "read:user",
    "user:email",
    "admin:repo_hook",
    "workflow",
    "security_events",
];

// `api_access` is not a GitLab scope and would fail the authorize request
const GITLAB_SCOPES: &[&str] = &[
    "api",
    "read_user",
    "read_repository",
    "write_repository",
    "read_registry",
    "write_registry",
    "read_api",
];

/// OAuth app registration for one provider
#[derive(Clone)]
pub struct OAuthApp {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Secret for signing webhooks; the client secret is used when unset
    pub webhook_secret: Option<String>,
}

impl OAuthApp {
    fn from_env(prefix: &str) -> Self {
        Self {
            client_id: non_empty(&format!("{}_CLIENT_ID", prefix)),
            client_secret: non_empty(&format!("{}_CLIENT_SECRET", prefix)),
            webhook_secret: non_empty(&format!("{}_WEBHOOK_SECRET", prefix)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    /// Public base URL of this service (OAuth redirects land here)
    pub app_url: String,
    pub port: u16,
    pub github: OAuthApp,
    /// GitHub REST API base
    pub github_api_url: String,
    /// GitHub web host serving the OAuth endpoints
    pub github_url: String,
    pub gitlab: OAuthApp,
    /// GitLab host; the API is served under `/api/v4`
    pub gitlab_url: String,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn trimmed(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(port = %raw, "Invalid PORT, falling back to 8080");
                8080
            }),
            Err(_) => 8080,
        };

        Self {
            app_url: trimmed(
                env::var("APP_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            ),
            port,
            github: OAuthApp::from_env("GITHUB"),
            github_api_url: trimmed(
                env::var("GITHUB_API_URL")
                    .unwrap_or_else(|_| "https://api.github.com".to_string()),
            ),
            github_url: trimmed(
                env::var("GITHUB_URL").unwrap_or_else(|_| "https://github.com".to_string()),
            ),
            gitlab: OAuthApp::from_env("GITLAB"),
            gitlab_url: trimmed(
                env::var("GITLAB_URL").unwrap_or_else(|_| "https://gitlab.com".to_string()),
            ),
        }
    }

    fn app(&self, kind: ProviderKind) -> &OAuthApp {
        match kind {
            ProviderKind::GitHub => &self.github,
            ProviderKind::GitLab => &self.gitlab,
        }
    }

    /// Check if a provider's OAuth app is configured
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        let app = self.app(kind);
        app.client_id.is_some() && app.client_secret.is_some()
    }

    pub fn api_url(&self, kind: ProviderKind) -> String {
        match kind {
            ProviderKind::GitHub => self.github_api_url.clone(),
            ProviderKind::GitLab => format!("{}/api/v4", self.gitlab_url),
        }
    }

    pub fn redirect_uri(&self, kind: ProviderKind) -> String {
        format!("{}/api/auth/{}/callback", self.app_url, kind)
    }

    /// Provider configuration carrying the OAuth client secret
    ///
    /// `None` when the provider is not configured.
    pub fn provider_config(&self, kind: ProviderKind) -> Option<ProviderConfig> {
        let app = self.app(kind);
        let (client_id, client_secret) = match (&app.client_id, &app.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone()),
            _ => return None,
        };

        let scopes = match kind {
            ProviderKind::GitHub => GITHUB_SCOPES,
            ProviderKind::GitLab => GITLAB_SCOPES,
        };

        Some(ProviderConfig {
            client_id,
            credential: Credential::ClientSecret(client_secret),
            redirect_uri: self.redirect_uri(kind),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            api_url: self.api_url(kind),
            webhook_secret: app.webhook_secret.clone(),
        })
    }

    pub fn oauth_endpoints(&self) -> OAuthEndpoints {
        OAuthEndpoints {
            github_url: self.github_url.clone(),
            gitlab_url: self.gitlab_url.clone(),
        }
    }
}
