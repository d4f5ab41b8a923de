//! GitHub adapter
//!
//! REST v3 client implementing the git provider contract.

pub mod client;

pub use client::GitHubClient;
