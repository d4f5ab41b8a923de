//! GitHub REST API adapter

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use urlencoding::encode;

use crate::adapters::http::{self, PER_PAGE};
use crate::adapters::WebhookSigner;
use crate::domain::entities::{
    Branch, BranchCommit, BranchProtectionRule, Credential, GitUser, ProviderConfig, ProviderKind,
    Repository, Webhook,
};
use crate::domain::ports::GitProviderClient;
use crate::error::GitProviderError;

const USER_AGENT: &str = "shipyard-api";
const API_VERSION: &str = "2022-11-28";

/// Review count applied when a rule requires pull requests without a count
const DEFAULT_REVIEW_COUNT: u32 = 1;

/// Implementation of the git provider contract for GitHub
pub struct GitHubClient {
    http: Client,
    session: OnceLock<GitHubSession>,
}

/// State established by `initialize`
struct GitHubSession {
    api_url: String,
    auth: GitHubAuth,
    webhook_secret: String,
    signer: WebhookSigner,
}

enum GitHubAuth {
    /// User access token from the OAuth exchange
    Token(String),
    /// OAuth app credentials, sent as basic auth
    App {
        client_id: String,
        client_secret: String,
    },
}

impl GitHubClient {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            session: OnceLock::new(),
        }
    }

    fn session(&self) -> Result<&GitHubSession, GitProviderError> {
        self.session
            .get()
            .ok_or(GitProviderError::NotInitialized(ProviderKind::GitHub))
    }

    fn request(&self, session: &GitHubSession, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .header("X-GitHub-Api-Version", API_VERSION);

        match &session.auth {
            GitHubAuth::Token(token) => builder.bearer_auth(token),
            GitHubAuth::App {
                client_id,
                client_secret,
            } => builder.basic_auth(client_id, Some(client_secret)),
        }
    }

    /// Follow `Link: rel="next"` until the last page
    async fn get_all<T: DeserializeOwned>(
        &self,
        session: &GitHubSession,
        first_url: String,
    ) -> Result<Vec<T>, GitProviderError> {
        let mut items = Vec::new();
        let mut next = Some(first_url);

        while let Some(url) = next {
            // The bearer token must never follow a link off the API host
            if !session.owns(&url) {
                tracing::warn!(
                    provider = %ProviderKind::GitHub,
                    link = %url,
                    "Refusing pagination link outside the API base"
                );
                return Err(GitProviderError::ForeignLink(url));
            }
            let resp = self.request(session, Method::GET, &url).send().await?;
            next = http::next_link(resp.headers());
            let page: Vec<T> = http::handle_response(resp).await?;
            items.extend(page);
        }

        Ok(items)
    }
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubSession {
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// True when `url` sits under the configured API base
    fn owns(&self, url: &str) -> bool {
        url.strip_prefix(&self.api_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }

    fn repo_url(&self, owner: &str, repo: &str, rest: &str) -> String {
        self.api_url(&format!("/repos/{}/{}{}", encode(owner), encode(repo), rest))
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

/// Request types for GitHub API
#[derive(Serialize)]
struct CreateHookRequest<'a> {
    name: &'a str,
    active: bool,
    events: &'a [String],
    config: HookConfig<'a>,
}

#[derive(Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'a str,
    secret: &'a str,
    insecure_ssl: &'a str,
}

/// Body of `PUT /branches/{branch}/protection`
///
/// GitHub requires every key to be present; `None` is sent as `null`.
#[derive(Serialize)]
struct UpdateProtectionRequest<'a> {
    required_status_checks: Option<RequiredStatusChecks<'a>>,
    enforce_admins: bool,
    required_pull_request_reviews: Option<RequiredReviews>,
    restrictions: Option<()>,
}

#[derive(Serialize)]
struct RequiredStatusChecks<'a> {
    strict: bool,
    contexts: &'a [String],
}

#[derive(Serialize)]
struct RequiredReviews {
    required_approving_review_count: u32,
}

/// Response types from GitHub API
#[derive(Deserialize)]
struct GitHubUserResponse {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: String,
}

impl From<GitHubUserResponse> for GitUser {
    fn from(r: GitHubUserResponse) -> Self {
        GitUser {
            id: r.id.to_string(),
            login: r.login,
            name: r.name,
            email: r.email,
            avatar_url: r.avatar_url,
        }
    }
}

#[derive(Deserialize)]
struct GitHubRepoResponse {
    id: u64,
    name: String,
    full_name: String,
    private: bool,
    description: Option<String>,
    default_branch: String,
    clone_url: String,
}

impl From<GitHubRepoResponse> for Repository {
    fn from(r: GitHubRepoResponse) -> Self {
        Repository {
            id: r.id.to_string(),
            name: r.name,
            full_name: r.full_name,
            private: r.private,
            description: r.description,
            default_branch: r.default_branch,
            clone_url: r.clone_url,
            provider: ProviderKind::GitHub,
        }
    }
}

#[derive(Deserialize)]
struct GitHubBranchResponse {
    name: String,
    commit: GitHubCommitRef,
    protected: bool,
}

#[derive(Deserialize)]
struct GitHubCommitRef {
    sha: String,
    url: String,
}

impl From<GitHubBranchResponse> for Branch {
    fn from(r: GitHubBranchResponse) -> Self {
        Branch {
            name: r.name,
            commit: BranchCommit {
                sha: r.commit.sha,
                url: r.commit.url,
            },
            protected: r.protected,
        }
    }
}

#[derive(Deserialize)]
struct GitHubHookResponse {
    id: u64,
    active: bool,
    events: Vec<String>,
    config: GitHubHookConfigResponse,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct GitHubHookConfigResponse {
    #[serde(default)]
    url: Option<String>,
}

impl From<GitHubHookResponse> for Webhook {
    fn from(r: GitHubHookResponse) -> Self {
        Webhook {
            id: r.id.to_string(),
            url: r.config.url.unwrap_or_default(),
            active: r.active,
            events: r.events,
            created_at: r.created_at,
        }
    }
}

#[derive(Deserialize)]
struct GitHubProtectionResponse {
    #[serde(default)]
    required_pull_request_reviews: Option<GitHubReviewsResponse>,
    #[serde(default)]
    required_status_checks: Option<GitHubStatusChecksResponse>,
}

#[derive(Deserialize)]
struct GitHubReviewsResponse {
    #[serde(default)]
    required_approving_review_count: Option<u32>,
}

#[derive(Deserialize)]
struct GitHubStatusChecksResponse {
    #[serde(default)]
    contexts: Vec<String>,
}

impl GitHubProtectionResponse {
    fn into_rule(self, branch: &str) -> BranchProtectionRule {
        BranchProtectionRule {
            pattern: branch.to_string(),
            require_pull_request: self.required_pull_request_reviews.is_some(),
            required_review_count: self
                .required_pull_request_reviews
                .and_then(|r| r.required_approving_review_count),
            require_status_checks: self.required_status_checks.is_some(),
            status_checks: self
                .required_status_checks
                .map(|c| c.contexts)
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl GitProviderClient for GitHubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::GitHub
    }

    async fn initialize(&self, config: ProviderConfig) -> Result<(), GitProviderError> {
        if self.session.get().is_some() {
            return Err(GitProviderError::AlreadyInitialized(ProviderKind::GitHub));
        }

        let webhook_secret = config.signing_secret().to_string();
        let signer = WebhookSigner::new(&webhook_secret)?;
        let strategy = if config.credential.is_access_token() {
            "token"
        } else {
            "app"
        };
        let auth = match config.credential {
            Credential::AccessToken(token) => GitHubAuth::Token(token),
            Credential::ClientSecret(client_secret) => GitHubAuth::App {
                client_id: config.client_id,
                client_secret,
            },
        };

        let session = GitHubSession {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            auth,
            webhook_secret,
            signer,
        };

        self.session
            .set(session)
            .map_err(|_| GitProviderError::AlreadyInitialized(ProviderKind::GitHub))?;

        tracing::debug!(
            provider = %ProviderKind::GitHub,
            auth = strategy,
            "Git provider initialized"
        );
        Ok(())
    }

    async fn current_user(&self) -> Result<GitUser, GitProviderError> {
        let session = self.session()?;
        let resp = self
            .request(session, Method::GET, &session.api_url("/user"))
            .send()
            .await?;

        let user: GitHubUserResponse = http::handle_response(resp).await?;
        Ok(user.into())
    }

    async fn list_repositories(&self) -> Result<Vec<Repository>, GitProviderError> {
        let session = self.session()?;
        let url = session.api_url(&format!(
            "/user/repos?affiliation=owner,collaborator&per_page={}",
            PER_PAGE
        ));

        let repos: Vec<GitHubRepoResponse> = self.get_all(session, url).await?;
        Ok(repos.into_iter().map(|r| r.into()).collect())
    }

    async fn get_repository(&self, owner: &str, name: &str) -> Result<Repository, GitProviderError> {
        let session = self.session()?;
        let resp = self
            .request(session, Method::GET, &session.repo_url(owner, name, ""))
            .send()
            .await?;

        let repo: GitHubRepoResponse = http::handle_response(resp)
            .await
            .map_err(|e| repo_not_found(e, owner, name))?;
        Ok(repo.into())
    }

    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, GitProviderError> {
        let session = self.session()?;
        let url = session.repo_url(owner, repo, &format!("/branches?per_page={}", PER_PAGE));

        let branches: Vec<GitHubBranchResponse> = self
            .get_all(session, url)
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
        let resp = self
            .request(session, Method::POST, &session.repo_url(owner, repo, "/hooks"))
            .json(&CreateHookRequest {
                name: "web",
                active: true,
                events,
                config: HookConfig {
                    url,
                    content_type: "json",
                    secret: &session.webhook_secret,
                    insecure_ssl: "0",
                },
            })
            .send()
            .await?;

        let hook: GitHubHookResponse = http::handle_response(resp)
            .await
            .map_err(|e| repo_not_found(e, owner, repo))?;

        tracing::info!(
            provider = %ProviderKind::GitHub,
            owner = %owner,
            repo = %repo,
            hook_id = hook.id,
            "Webhook created"
        );
        Ok(hook.into())
    }

    async fn delete_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_id: &str,
    ) -> Result<(), GitProviderError> {
        let session = self.session()?;
        let url = session.repo_url(owner, repo, &format!("/hooks/{}", encode(webhook_id)));
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
        let url = session.repo_url(owner, repo, &format!("/hooks?per_page={}", PER_PAGE));

        let hooks: Vec<GitHubHookResponse> = self
            .get_all(session, url)
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
        let url = session.repo_url(
            owner,
            repo,
            &format!("/branches/{}/protection", encode(&rule.pattern)),
        );

        let body = UpdateProtectionRequest {
            required_status_checks: rule.require_status_checks.then(|| RequiredStatusChecks {
                strict: true,
                contexts: rule.effective_status_checks(),
            }),
            // Admins are always bound by the rule
            enforce_admins: true,
            required_pull_request_reviews: rule.require_pull_request.then(|| RequiredReviews {
                required_approving_review_count: rule
                    .effective_review_count()
                    .unwrap_or(DEFAULT_REVIEW_COUNT),
            }),
            restrictions: None,
        };

        let resp = self
            .request(session, Method::PUT, &url)
            .json(&body)
            .send()
            .await?;

        http::handle_empty_response(resp).await?;

        tracing::info!(
            provider = %ProviderKind::GitHub,
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
        let url = session.repo_url(
            owner,
            repo,
            &format!("/branches/{}/protection", encode(branch_pattern)),
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
        let url = session.repo_url(
            owner,
            repo,
            &format!("/branches/{}/protection", encode(branch)),
        );
        let resp = self.request(session, Method::GET, &url).send().await?;

        match http::handle_response::<GitHubProtectionResponse>(resp).await {
            Ok(protection) => Ok(Some(protection.into_rule(branch))),
            // "Branch not protected"
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
        Ok(session.signer.verify_prefixed(payload, signature))
    }
}
