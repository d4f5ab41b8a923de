//! GitLab REST v4 adapter

use std::collections::BTreeMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use urlencoding::encode;

use super::events::{from_gitlab_events, to_gitlab_events};
use crate::adapters::http::{self, PER_PAGE};
use crate::adapters::WebhookSigner;
use crate::domain::entities::{
    Branch, BranchCommit, BranchProtectionRule, Credential, GitUser, ProviderConfig, ProviderKind,
    Repository, Webhook,
};
use crate::domain::ports::GitProviderClient;
use crate::error::GitProviderError;

/// GitLab access levels
const NO_ACCESS: u32 = 0;
const MAINTAINER_ACCESS: u32 = 40;

/// Implementation of the git provider contract for GitLab
pub struct GitLabClient {
    http: Client,
    session: OnceLock<GitLabSession>,
}

struct GitLabSession {
    api_url: String,
    token: String,
    webhook_secret: String,
    signer: WebhookSigner,
}

impl GitLabClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            session: OnceLock::new(),
        }
    }

    fn session(&self) -> Result<&GitLabSession, GitProviderError> {
        self.session
            .get()
            .ok_or(GitProviderError::NotInitialized(ProviderKind::GitLab))
    }

    fn request(&self, session: &GitLabSession, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Accept", "application/json")
            .bearer_auth(&session.token)
    }

    /// Walk `x-next-page` until GitLab reports no further page
    async fn get_all<T: DeserializeOwned>(
        &self,
        session: &GitLabSession,
        url: &str,
    ) -> Result<Vec<T>, GitProviderError> {
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = Some(1);

        while let Some(current) = page {
            let page_url = format!(
                "{}{}per_page={}&page={}",
                url, separator, PER_PAGE, current
            );
            let resp = self.request(session, Method::GET, &page_url).send().await?;
            page = http::next_page(resp.headers());
            let batch: Vec<T> = http::handle_response(resp).await?;
            items.extend(batch);
        }

        Ok(items)
    }

    async fn protect_branch(
        &self,
        session: &GitLabSession,
        owner: &str,
        repo: &str,
        body: &ProtectBranchRequest<'_>,
    ) -> Result<(), GitProviderError> {
        let resp = self
            .request(
                session,
                Method::POST,
                &session.project_url(owner, repo, "/protected_branches"),
            )
            .json(body)
            .send()
            .await?;

        http::handle_empty_response(resp)
            .await
            .map_err(|e| repo_not_found(e, owner, repo))
    }
}

impl Default for GitLabClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitLabSession {
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Project-scoped URL; the project is addressed by its encoded full path
    fn project_url(&self, owner: &str, repo: &str, rest: &str) -> String {
        let project = format!("{}/{}", owner, repo);
        self.api_url(&format!("/projects/{}{}", encode(&project), rest))
    }
}

fn repo_not_found(err: GitProviderError, owner: &str, repo: &str) -> GitProviderError {
    if err.is_not_found() {
        GitProviderError::RepoNotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    } else {
        err
    }
}

/// Request types for GitLab API
#[derive(Serialize)]
struct ProtectBranchRequest<'a> {
    name: &'a str,
    push_access_level: u32,
    merge_access_level: u32,
}

/// Response types from GitLab API
#[derive(Deserialize)]
struct GitLabUserResponse {
    id: u64,
    username: String,
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

impl From<GitLabUserResponse> for GitUser {
    fn from(r: GitLabUserResponse) -> Self {
        GitUser {
            id: r.id.to_string(),
            login: r.username,
            name: r.name,
            email: r.email,
            avatar_url: r.avatar_url.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct GitLabProjectResponse {
    id: u64,
    name: String,
    path_with_namespace: String,
    visibility: String,
    description: Option<String>,
    // Null for empty projects
    default_branch: Option<String>,
    http_url_to_repo: String,
}

impl From<GitLabProjectResponse> for Repository {
    fn from(r: GitLabProjectResponse) -> Self {
        Repository {
            id: r.id.to_string(),
            name: r.name,
            full_name: r.path_with_namespace,
            private: r.visibility == "private",
            description: r.description,
            default_branch: r.default_branch.unwrap_or_default(),
            clone_url: r.http_url_to_repo,
            provider: ProviderKind::GitLab,
        }
    }
}

#[derive(Deserialize)]
struct GitLabBranchResponse {
    name: String,
    commit: GitLabCommitResponse,
    protected: bool,
}

#[derive(Deserialize)]
struct GitLabCommitResponse {
    id: String,
    web_url: String,
}

impl From<GitLabBranchResponse> for Branch {
    fn from(r: GitLabBranchResponse) -> Self {
        Branch {
            name: r.name,
            commit: BranchCommit {
                sha: r.commit.id,
                url: r.commit.web_url,
            },
            protected: r.protected,
        }
    }
}

#[derive(Deserialize)]
struct GitLabHookResponse {
    id: u64,
    url: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    alert_status: Option<String>,
    /// Remaining fields, including every `*_events` flag
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl GitLabHookResponse {
    fn is_active(&self) -> bool {
        !matches!(
            self.alert_status.as_deref(),
            Some("disabled") | Some("temporarily_disabled")
        )
    }

    /// Enabled event flags, in alphabetical order
    fn enabled_flags(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(key, value)| key.ends_with("_events") && **value == Value::Bool(true))
            .map(|(key, _)| key.as_str())
    }

    fn into_webhook(self, events: Vec<String>) -> Webhook {
        let active = self.is_active();
        Webhook {
            id: self.id.to_string(),
            url: self.url,
            active,
            events,
            created_at: self.created_at,
        }
    }
}

impl From<GitLabHookResponse> for Webhook {
    fn from(r: GitLabHookResponse) -> Self {
        let events = from_gitlab_events(r.enabled_flags());
        r.into_webhook(events)
    }
}

#[derive(Deserialize)]
struct GitLabProtectedBranchResponse {
    #[serde(default)]
    merge_access_levels: Vec<GitLabAccessLevel>,
}

#[derive(Deserialize)]
struct GitLabAccessLevel {
    access_level: u32,
}

impl GitLabProtectedBranchResponse {
    /// GitLab has no status-check concept here; those fields always read as unset
    fn into_rule(self, branch: &str) -> BranchProtectionRule {
        BranchProtectionRule {
            pattern: branch.to_string(),
            require_pull_request: self
                .merge_access_levels
                .iter()
                .any(|level| level.access_level == MAINTAINER_ACCESS),
            required_review_count: None,
            require_status_checks: false,
            status_checks: Vec::new(),
        }
    }
}

/// Body for `POST /projects/:id/hooks`
///
/// `push_events` defaults to true on GitLab, so it is always sent.
fn hook_request_body(url: &str, token: &str, flags: &[String]) -> Value {
    let mut body = Map::new();
    body.insert("url".to_string(), Value::from(url));
    body.insert("token".to_string(), Value::from(token));
    body.insert("enable_ssl_verification".to_string(), Value::Bool(true));
    body.insert("push_events".to_string(), Value::Bool(false));
    for flag in flags {
        body.insert(flag.clone(), Value::Bool(true));
    }
    Value::Object(body)
}

#[async_trait]
impl GitProviderClient for GitLabClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitLab
    }

    async fn initialize(&self, config: ProviderConfig) -> Result<(), GitProviderError> {
        if self.session.get().is_some() {
            return Err(GitProviderError::AlreadyInitialized(ProviderKind::GitLab));
        }

        let webhook_secret = config.signing_secret().to_string();
        let token = match config.credential {
            Credential::AccessToken(token) => token,
            Credential::ClientSecret(_) => {
                return Err(GitProviderError::InvalidCredential(
                    "GitLab requires a user access token".to_string(),
                ))
            }
        };
        let signer = WebhookSigner::new(&webhook_secret)?;

        let session = GitLabSession {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            webhook_secret,
            signer,
        };

        self.session
            .set(session)
            .map_err(|_| GitProviderError::AlreadyInitialized(ProviderKind::GitLab))?;

        tracing::debug!(provider = %ProviderKind::GitLab, "Git provider initialized");
        Ok(())
    }

    async fn current_user(&self) -> Result<GitUser, GitProviderError> {
        let session = self.session()?;
        let resp = self
            .request(session, Method::GET, &session.api_url("/user"))
            .send()
            .await?;

        let user: GitLabUserResponse = http::handle_response(resp).await?;
        Ok(user.into())
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, GitProviderError> {
        let session = self.session()?;
        let url = session.api_url("/projects?membership=true");

        let projects: Vec<GitLabProjectResponse> = self.get_all(session, &url).await?;
        Ok(projects.into_iter().map(|p| p.into()).collect())
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository, GitProviderError> {
        let session = self.session()?;
        let resp = self
            .request(session, Method::GET, &session.project_url(owner, name, ""))
            .send()
            .await?;

        let project: GitLabProjectResponse = http::handle_response(resp)
            .await
            .map_err(|e| repo_not_found(e, owner, name))?;
        Ok(project.into())
    }

    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, GitProviderError> {
        let session = self.session()?;
        let url = session.project_url(owner, repo, "/repository/branches");

        let branches: Vec<GitLabBranchResponse> = self
            .get_all(session, &url)
            .await
            .map_err(|e| repo_not_found(e, owner, repo))?;
        Ok(branches.into_iter().map(|b| b.into()).collect())
    }

    async fn create_webhook(
        &self,
        owner: &str,
        repo: &str,
        url: &str,
        events: &[String],
    ) -> Result<Webhook, GitProviderError> {
        let session = self.session()?;
        let flags = to_gitlab_events(events);

        let resp = self
            .request(session, Method::POST, &session.project_url(owner, repo, "/hooks"))
            .json(&hook_request_body(url, &session.webhook_secret, &flags))
            .send()
            .await?;

        let hook: GitLabHookResponse = http::handle_response(resp)
            .await
            .map_err(|e| repo_not_found(e, owner, repo))?;

        tracing::info!(
            provider = %ProviderKind::GitLab,
            owner = %owner,
            repo = %repo,
            hook_id = hook.id,
            "Webhook created"
        );

        // Read back what GitLab enabled; flags it does not know are dropped server-side
        let events = from_gitlab_events(hook.enabled_flags());
        Ok(hook.into_webhook(events))
    }

    async fn delete_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_id: &str,
    ) -> Result<(), GitProviderError> {
        let session = self.session()?;
        let url = session.project_url(owner, repo, &format!("/hooks/{}", encode(webhook_id)));
        let resp = self.request(session, Method::DELETE, &url).send().await?;

        http::handle_empty_response(resp).await.map_err(|e| {
            if e.is_not_found() {
                GitProviderError::WebhookNotFound {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    id: webhook_id.to_string(),
                }
            } else {
                e
            }
        })
    }

    async fn list_webhooks(&self, owner: &str, repo: &str) -> Result<Vec<Webhook>, GitProviderError> {
        let session = self.session()?;
        let url = session.project_url(owner, repo, "/hooks");

        let hooks: Vec<GitLabHookResponse> = self
            .get_all(session, &url)
            .await
            .map_err(|e| repo_not_found(e, owner, repo))?;
        Ok(hooks.into_iter().map(|h| h.into()).collect())
    }

    async fn create_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        rule: &BranchProtectionRule,
    ) -> Result<(), GitProviderError> {
        let session = self.session()?;
        let merge_access_level = if rule.require_pull_request {
            MAINTAINER_ACCESS
        } else {
            NO_ACCESS
        };

        let body = ProtectBranchRequest {
            name: &rule.pattern,
            push_access_level: NO_ACCESS,
            merge_access_level,
        };

        match self.protect_branch(session, owner, repo, &body).await {
            // GitLab rejects protecting a branch twice
            Err(GitProviderError::Api { status: 409, .. }) => {
                tracing::debug!(
                    provider = %ProviderKind::GitLab,
                    owner = %owner,
                    repo = %repo,
                    branch = %rule.pattern,
                    "Branch already protected, replacing rule"
                );
                self.remove_branch_protection(owner, repo, &rule.pattern).await?;
                self.protect_branch(session, owner, repo, &body).await?;
            }
            result => result?,
        }

        tracing::info!(
            provider = %ProviderKind::GitLab,
            owner = %owner,
            repo = %repo,
            branch = %rule.pattern,
            "Branch protection applied"
        );
        Ok(())
    }

    async fn remove_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch_pattern: &str,
    ) -> Result<(), GitProviderError> {
        let session = self.session()?;
        let url = session.project_url(
            owner,
            repo,
            &format!("/protected_branches/{}", encode(branch_pattern)),
        );
        let resp = self.request(session, Method::DELETE, &url).send().await?;

        http::handle_empty_response(resp).await.map_err(|e| {
            if e.is_not_found() {
                GitProviderError::NotFound(format!(
                    "branch protection for {} in {}/{}",
                    branch_pattern, owner, repo
                ))
            } else {
                e
            }
        })
    }

    async fn get_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<BranchProtectionRule>, GitProviderError> {
        let session = self.session()?;
        let url = session.project_url(
            owner,
            repo,
            &format!("/protected_branches/{}", encode(branch)),
        );
        let resp = self.request(session, Method::GET, &url).send().await?;

        match http::handle_response::<GitLabProtectedBranchResponse>(resp).await {
            Ok(protection) => Ok(Some(protection.into_rule(branch))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn validate_webhook_payload(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<bool, GitProviderError> {
        let session = self.session()?;
        Ok(session.signer.verify_hex(payload, signature))
    }
}
