//! GitLab adapter
//!
//! REST v4 client implementing the git provider contract, plus the
//! translation between GitHub event names and GitLab hook flags.

pub mod client;
pub mod events;

pub use client::GitLabClient;
