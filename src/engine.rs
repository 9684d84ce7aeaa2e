//! Resolution engine: provider selection, aggregation, and delegation.
//!
//! The engine holds a registry of provider adapters and one active
//! provider. Version listing runs in aggregate mode when more than one
//! provider is registered (set-union, deduplicated, re-sorted descending);
//! flavor probing, build listing, and artifact resolution always delegate
//! to the active provider, since a build belongs to exactly one provider.
//!
//! The active-provider selector is the engine's only shared mutable state.
//! Every operation snapshot-reads it once up front, so a concurrent
//! `switch_provider` affects subsequent calls only.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, info};

use crate::provider::{
    ArtifactLocation, Build, Flavor, ProviderError, ProviderRegistry, RuntimeVersion,
    ServerProvider, sort_versions_descending,
};

/// Errors from engine construction and provider selection.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The registry contained no providers.
    #[error("no providers registered")]
    NoProviders,

    /// `switch_provider` named a provider that is not registered.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

/// Orchestrates the version → flavors → builds → artifact pipeline over a
/// selectable provider.
pub struct ResolutionEngine {
    registry: ProviderRegistry,
    active: RwLock<Arc<dyn ServerProvider>>,
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("providers", &self.registry.names())
            .field("active", &self.active_provider_name())
            .finish()
    }
}

impl ResolutionEngine {
    /// Creates an engine with the first registered provider active.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoProviders`] for an empty registry.
    pub fn new(registry: ProviderRegistry) -> Result<Self, EngineError> {
        let active = registry.first().ok_or(EngineError::NoProviders)?;
        Ok(Self {
            registry,
            active: RwLock::new(active),
        })
    }

    /// Whether version listing unions all providers.
    #[must_use]
    pub fn aggregate(&self) -> bool {
        self.registry.len() > 1
    }

    /// Registered provider names, in registration order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    /// Name of the currently active provider.
    #[must_use]
    pub fn active_provider_name(&self) -> &'static str {
        self.snapshot().name()
    }

    /// Switches the active provider. No other side effects: only the
    /// delegation target of subsequent calls changes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownProvider`] when `name` is not
    /// registered; the active provider is left unchanged.
    pub fn switch_provider(&self, name: &str) -> Result<(), EngineError> {
        let provider = self
            .registry
            .get(name)
            .ok_or_else(|| EngineError::UnknownProvider(name.to_string()))?;
        match self.active.write() {
            Ok(mut guard) => *guard = provider,
            Err(mut poisoned) => **poisoned.get_mut() = provider,
        }
        info!(provider = name, "switched active provider");
        Ok(())
    }

    /// Atomic snapshot of the active provider for the duration of one call.
    fn snapshot(&self) -> Arc<dyn ServerProvider> {
        match self.active.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Lists release runtime versions.
    ///
    /// In aggregate mode this is the union of every provider's listing,
    /// deduplicated by version id and re-sorted descending; otherwise the
    /// active provider's listing as-is.
    pub async fn list_runtime_versions(&self) -> Vec<RuntimeVersion> {
        if !self.aggregate() {
            return self.snapshot().list_runtime_versions().await;
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut merged: Vec<RuntimeVersion> = Vec::new();
        for provider in self.registry.iter() {
            let listed = provider.list_runtime_versions().await;
            debug!(
                provider = provider.name(),
                versions = listed.len(),
                "aggregating version listing"
            );
            for version in listed {
                if seen.insert(version.id.clone()) {
                    merged.push(version);
                }
            }
        }
        sort_versions_descending(&mut merged);
        merged
    }

    /// Probes flavor availability for a version on the active provider.
    pub async fn probe_flavors(&self, version: &str) -> BTreeSet<Flavor> {
        self.snapshot().probe_flavors(version).await
    }

    /// Lists builds for a (version, flavor) pair on the active provider.
    pub async fn list_builds(&self, version: &str, flavor: Flavor) -> Vec<Build> {
        self.snapshot().list_builds(version, flavor).await
    }

    /// Resolves a build to an artifact location on the active provider.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotFound`] for a stale or malformed build id;
    /// other variants on hard upstream failure.
    pub async fn resolve_artifact(
        &self,
        version: &str,
        flavor: Flavor,
        build_id: &str,
    ) -> Result<ArtifactLocation, ProviderError> {
        self.snapshot()
            .resolve_artifact(version, flavor, build_id)
            .await
    }
}
