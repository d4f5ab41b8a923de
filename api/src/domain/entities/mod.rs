//! Domain entities
//!
//! Provider-neutral models shared by every git adapter.

pub mod git;
pub mod provider_config;

pub use git::{
    Branch, BranchCommit, BranchProtectionRule, GitUser, ProviderKind, Repository, Webhook,
};
pub use provider_config::{Credential, ProviderConfig};
