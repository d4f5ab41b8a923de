//! OAuth authorization-code flow
//!
//! Builds the provider authorize URL and exchanges the returned code for a
//! user access token. The resulting token is fed back into the registry via
//! `ProviderConfig::with_access_token`.

use reqwest::Client;
use serde::Deserialize;
use urlencoding::encode;

use crate::domain::entities::{ProviderConfig, ProviderKind};
use crate::error::OAuthError;

/// Web hosts serving the provider OAuth endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub github_url: String,
    pub gitlab_url: String,
}

impl OAuthEndpoints {
    fn host(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::GitHub => self.github_url.trim_end_matches('/'),
            ProviderKind::GitLab => self.gitlab_url.trim_end_matches('/'),
        }
    }

    pub fn authorize_endpoint(&self, kind: ProviderKind) -> String {
        match kind {
            ProviderKind::GitHub => format!("{}/login/oauth/authorize", self.host(kind)),
            ProviderKind::GitLab => format!("{}/oauth/authorize", self.host(kind)),
        }
    }

    pub fn token_endpoint(&self, kind: ProviderKind) -> String {
        match kind {
            ProviderKind::GitHub => format!("{}/login/oauth/access_token", self.host(kind)),
            ProviderKind::GitLab => format!("{}/oauth/token", self.host(kind)),
        }
    }
}

/// Token endpoint response; both providers share this shape
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// URL the user is redirected to in order to grant access
pub fn authorize_url(
    kind: ProviderKind,
    config: &ProviderConfig,
    endpoints: &OAuthEndpoints,
    state: &str,
) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&state={}",
        endpoints.authorize_endpoint(kind),
        encode(&config.client_id),
        encode(&config.redirect_uri),
        encode(&config.scope_param()),
        encode(state)
    )
}

/// Exchange an authorization code for an access token
///
/// `config` must still carry the client secret.
pub async fn exchange_code(
    http: &Client,
    kind: ProviderKind,
    config: &ProviderConfig,
    endpoints: &OAuthEndpoints,
    code: &str,
) -> Result<String, OAuthError> {
    let client_secret = config.credential.secret();
    let mut form = vec![
        ("client_id", config.client_id.as_str()),
        ("client_secret", client_secret),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];
    if kind == ProviderKind::GitLab {
        form.push(("grant_type", "authorization_code"));
    }

    let response = http
        .post(endpoints.token_endpoint(kind))
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    // GitLab reports a rejected code as 400 with an error body
    let token_data: TokenResponse = match response.json().await {
        Ok(data) => data,
        Err(_) if !status.is_success() => {
            return Err(OAuthError::Status {
                status: status.as_u16(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(error) = token_data.error {
        let description = token_data.error_description.unwrap_or_default();
        tracing::warn!(provider = %kind, "OAuth error: {} - {}", error, description);
        return Err(OAuthError::Provider { error, description });
    }

    if !status.is_success() {
        return Err(OAuthError::Status {
            status: status.as_u16(),
        });
    }

    token_data.access_token.ok_or(OAuthError::MissingToken)
}
