//! Adapter registry
//!
//! Hands out one initialized adapter per provider. The first caller for a
//! provider constructs and initializes it; every later caller, including
//! callers racing the first one, receives that same instance until it is
//! evicted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

use crate::adapters::{GitHubClient, GitLabClient};
use crate::domain::entities::{ProviderConfig, ProviderKind};
use crate::domain::ports::GitProviderClient;
use crate::error::GitProviderError;

/// Builds a fresh, uninitialized adapter for a provider
pub type AdapterFactory = Arc<dyn Fn(ProviderKind) -> Arc<dyn GitProviderClient> + Send + Sync>;

type Slot = Arc<OnceCell<Arc<dyn GitProviderClient>>>;

pub struct ProviderRegistry {
    slots: Mutex<HashMap<ProviderKind, Slot>>,
    factory: AdapterFactory,
}

fn real_adapter(kind: ProviderKind) -> Arc<dyn GitProviderClient> {
    match kind {
        ProviderKind::GitHub => Arc::new(GitHubClient::new()),
        ProviderKind::GitLab => Arc::new(GitLabClient::new()),
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::with_factory(Arc::new(real_adapter))
    }

    pub fn with_factory(factory: AdapterFactory) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            factory,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ProviderKind, Slot>> {
        // The map holds no invariant a panicking holder could break
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The slot for a provider, created empty on first use
    fn slot(&self, kind: ProviderKind) -> Slot {
        self.lock().entry(kind).or_default().clone()
    }

    /// Return the cached adapter, or construct and initialize one
    ///
    /// `config` is only used when no instance is cached. Concurrent first
    /// calls run a single `initialize` and share its outcome. A failed
    /// initialization is returned to the caller and nothing is cached.
    pub async fn get_service(
        &self,
        kind: ProviderKind,
        config: ProviderConfig,
    ) -> Result<Arc<dyn GitProviderClient>, GitProviderError> {
        let slot = self.slot(kind);

        if let Some(adapter) = slot.get() {
            tracing::debug!(provider = %kind, "Using cached git adapter");
            return Ok(adapter.clone());
        }

        let adapter = slot
            .get_or_try_init(|| async move {
                let adapter = (self.factory)(kind);
                adapter.initialize(config).await.map_err(|e| {
                    tracing::warn!(provider = %kind, error = %e, "Git adapter initialization failed");
                    e
                })?;
                tracing::info!(provider = %kind, "Git adapter initialized");
                Ok::<_, GitProviderError>(adapter)
            })
            .await?;

        Ok(adapter.clone())
    }

    /// Initialize a fresh adapter with `config` and make it the cached one
    ///
    /// The new adapter is fully initialized before it is published, so
    /// callers never observe an empty slot. On failure the previously
    /// cached adapter, if any, stays in place.
    pub async fn replace_service(
        &self,
        kind: ProviderKind,
        config: ProviderConfig,
    ) -> Result<Arc<dyn GitProviderClient>, GitProviderError> {
        let adapter = (self.factory)(kind);
        adapter.initialize(config).await.map_err(|e| {
            tracing::warn!(provider = %kind, error = %e, "Git adapter replacement failed");
            e
        })?;

        let slot = Arc::new(OnceCell::new_with(Some(adapter.clone())));
        let replaced = self.lock().insert(kind, slot).is_some();
        tracing::info!(provider = %kind, replaced, "Git adapter replaced");

        Ok(adapter)
    }

    /// The live adapter for a provider, if one is initialized
    pub fn cached(&self, kind: ProviderKind) -> Option<Arc<dyn GitProviderClient>> {
        self.lock()
            .get(&kind)
            .and_then(|slot| slot.get().cloned())
    }

    /// Evict one provider's adapter; existing holders keep their instance
    pub fn clear_service(&self, kind: ProviderKind) {
        if self.lock().remove(&kind).is_some() {
            tracing::info!(provider = %kind, "Git adapter evicted");
        }
    }

    /// Evict every cached adapter
    pub fn clear_all(&self) {
        let mut slots = self.lock();
        let evicted = slots.len();
        slots.clear();
        tracing::info!(evicted, "Git adapter cache cleared");
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
