//! Provider configuration
//!
//! Built once from process configuration. The only mutation is swapping the
//! client secret for an exchanged access token, via
//! [`ProviderConfig::with_access_token`].

/// The secret half of a provider configuration
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth application secret, used for the code exchange and app-only calls
    ClientSecret(String),
    /// Bearer token obtained from an authorization-code exchange
    AccessToken(String),
}

impl Credential {
    pub fn secret(&self) -> &str {
        match self {
            Credential::ClientSecret(s) | Credential::AccessToken(s) => s,
        }
    }

    pub fn is_access_token(&self) -> bool {
        matches!(self, Credential::AccessToken(_))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ClientSecret(_) => f.write_str("ClientSecret(***)"),
            Credential::AccessToken(_) => f.write_str("AccessToken(***)"),
        }
    }
}

/// Everything an adapter needs to talk to one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub client_id: String,
    pub credential: Credential,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    /// REST API base, without a trailing slash
    pub api_url: String,
    /// Secret used to sign webhooks; falls back to the credential when unset
    pub webhook_secret: Option<String>,
}

impl ProviderConfig {
    /// Replace the client secret with an exchanged access token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.credential = Credential::AccessToken(token.into());
        self
    }

    /// Secret shared with the provider for webhook signatures
    pub fn signing_secret(&self) -> &str {
        self.webhook_secret
            .as_deref()
            .unwrap_or_else(|| self.credential.secret())
    }

    /// Scopes in the space-separated form both providers expect
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}
