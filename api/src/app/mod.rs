//! Application layer
//!
//! Orchestration on top of the ports: the adapter registry.

pub mod provider_registry;

pub use provider_registry::{AdapterFactory, ProviderRegistry};
