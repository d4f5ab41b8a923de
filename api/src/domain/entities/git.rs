//! Provider-neutral git entities
//!
//! The vocabulary every adapter translates its provider's wire format into.
//! Identifiers are opaque strings: GitHub and GitLab both use integers today,
//! but callers must never rely on that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source-control platform with an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    GitHub,
    GitLab,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::GitHub, ProviderKind::GitLab];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GitHub => "github",
            ProviderKind::GitLab => "gitlab",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(ProviderKind::GitHub),
            "gitlab" => Ok(ProviderKind::GitLab),
            _ => Err(format!("Unknown git provider: {}", s)),
        }
    }
}

/// A repository (GitHub) or project (GitLab)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub name: String,
    /// `namespace/name`; GitLab namespaces may contain further slashes
    pub full_name: String,
    pub private: bool,
    pub description: Option<String>,
    /// Empty for a GitLab project that has no commits yet
    pub default_branch: String,
    pub clone_url: String,
    /// Always the adapter that produced this value
    pub provider: ProviderKind,
}

/// Head commit of a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
    pub url: String,
}

/// A branch as reported by the provider at listing time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: BranchCommit,
    pub protected: bool,
}

/// A repository webhook
///
/// `events` always uses GitHub event names; adapters for other providers
/// translate on the way in and out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub url: String,
    pub active: bool,
    pub events: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A branch protection rule in neutral form
///
/// `required_review_count` is only meaningful with `require_pull_request`,
/// and `status_checks` only with `require_status_checks`. Use the
/// `effective_*` accessors when translating to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchProtectionRule {
    pub pattern: String,
    pub require_pull_request: bool,
    #[serde(default)]
    pub required_review_count: Option<u32>,
    pub require_status_checks: bool,
    #[serde(default)]
    pub status_checks: Vec<String>,
}

impl BranchProtectionRule {
    /// A rule for `pattern` that requires nothing
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            require_pull_request: false,
            required_review_count: None,
            require_status_checks: false,
            status_checks: Vec::new(),
        }
    }

    pub fn with_pull_request(mut self, required_review_count: Option<u32>) -> Self {
        self.require_pull_request = true;
        self.required_review_count = required_review_count;
        self
    }

    pub fn with_status_checks<I, S>(mut self, contexts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_status_checks = true;
        self.status_checks = contexts.into_iter().map(Into::into).collect();
        self
    }

    pub fn effective_review_count(&self) -> Option<u32> {
        if self.require_pull_request {
            self.required_review_count
        } else {
            None
        }
    }

    pub fn effective_status_checks(&self) -> &[String] {
        if self.require_status_checks {
            &self.status_checks
        } else {
            &[]
        }
    }
}

/// The principal an adapter is authenticated as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitUser {
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: String,
}
