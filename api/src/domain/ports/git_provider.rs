//! Git provider port trait
//!
//! Defines the provider-neutral contract every git adapter implements.
//! Adapters are shared behind `Arc` by the provider registry, so every
//! method takes `&self`, including `initialize`.

use async_trait::async_trait;

use crate::domain::entities::{
    Branch, BranchProtectionRule, GitUser, ProviderConfig, ProviderKind, Repository, Webhook,
};
use crate::error::GitProviderError;

/// Port trait for git provider operations
///
/// `initialize` must succeed exactly once before any other method; until
/// then every method fails with [`GitProviderError::NotInitialized`].
#[async_trait]
pub trait GitProviderClient: Send + Sync {
    /// The provider this adapter talks to
    fn kind(&self) -> ProviderKind;

    /// Store credentials and build the provider client and webhook signer
    async fn initialize(&self, config: ProviderConfig) -> Result<(), GitProviderError>;

    // Identity

    /// The authenticated principal
    async fn current_user(&self) -> Result<GitUser, GitProviderError>;

    // Repositories

    /// Every repository visible to the authenticated principal
    async fn list_repositories(&self) -> Result<Vec<Repository>, GitProviderError>;

    /// A single repository; `RepoNotFound` if absent or inaccessible
    async fn get_repository(&self, owner: &str, name: &str)
        -> Result<Repository, GitProviderError>;

    /// Every branch with its current protection flag
    async fn list_branches(&self, owner: &str, repo: &str)
        -> Result<Vec<Branch>, GitProviderError>;

    // Webhooks

    /// Create a webhook; `events` use GitHub event names
    async fn create_webhook(
        &self,
        owner: &str,
        repo: &str,
        url: &str,
        events: &[String],
    ) -> Result<Webhook, GitProviderError>;

    /// Delete a webhook; `WebhookNotFound` if it does not exist
    async fn delete_webhook(
        &self,
        owner: &str,
        repo: &str,
        webhook_id: &str,
    ) -> Result<(), GitProviderError>;

    /// Every webhook on the repository
    async fn list_webhooks(&self, owner: &str, repo: &str)
        -> Result<Vec<Webhook>, GitProviderError>;

    // Branch protection

    /// Apply a protection rule to the branch named by `rule.pattern`, replacing any existing rule
    async fn create_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        rule: &BranchProtectionRule,
    ) -> Result<(), GitProviderError>;

    /// Remove the protection rule for `branch_pattern`
    async fn remove_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch_pattern: &str,
    ) -> Result<(), GitProviderError>;

    /// The rule protecting `branch`, or `None` when it carries no rule
    async fn get_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<BranchProtectionRule>, GitProviderError>;

    // Webhook signatures

    /// Check `signature` against the raw request body
    ///
    /// A mismatch is `Ok(false)`, never an error. The comparison runs in
    /// constant time.
    fn validate_webhook_payload(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<bool, GitProviderError>;
}
