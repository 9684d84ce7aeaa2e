//! Provider adapters over heterogeneous upstream metadata sources.
//!
//! Each upstream exposes its own schema, versioning scheme, and failure
//! modes. An adapter maps one upstream onto the engine's canonical shapes
//! behind the [`ServerProvider`] trait: list runtime versions, probe flavor
//! availability, list builds, resolve a build to an artifact location.
//! Listing operations fail soft (empty result plus a log event); only
//! resolution misses surface as [`ProviderError::NotFound`].
//!
//! # Architecture
//!
//! - [`ServerProvider`] - async trait individual adapters implement
//! - [`ProviderRegistry`] - named, insertion-ordered adapter collection
//! - [`BmclapiProvider`] - BMCLAPI mirror (six flavors)
//! - [`MojangProvider`] - official Mojang manifest + Fabric meta

pub mod bmclapi;
mod error;
mod http;
pub mod mojang;

pub use bmclapi::BmclapiProvider;
pub use error::ProviderError;
pub use http::{IDENTITY_HEADER, MetaClient};
pub use mojang::MojangProvider;

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::events::EventBus;
use crate::identity::IdentityProvider;
use crate::version_key::VersionKey;

/// Release channel of a runtime version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// A stable release.
    Release,
    /// Anything else upstream reports (snapshot, beta, ...).
    Other(String),
}

/// An externally-defined runtime version identifier plus its channel.
///
/// Fetched fresh per listing call; never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeVersion {
    /// Opaque upstream identifier, e.g. `"1.20.1"`.
    pub id: String,
    /// Channel the upstream reported for this version.
    pub channel: Channel,
}

impl RuntimeVersion {
    /// Creates a release-channel runtime version.
    #[must_use]
    pub fn release(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            channel: Channel::Release,
        }
    }
}

/// A build variant/distribution family.
///
/// The vocabulary is fixed by what the upstreams serve; `Vanilla` is always
/// available for any runtime version as the degenerate single-build flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flavor {
    /// The unmodified server.
    Vanilla,
    /// Forge mod-loader installer builds.
    Forge,
    /// Fabric loader+installer composite builds.
    Fabric,
    /// NeoForge installer builds.
    NeoForge,
    /// LiteLoader maven artifacts.
    LiteLoader,
    /// OptiFine typed patch builds.
    OptiFine,
}

impl Flavor {
    /// Every flavor any adapter knows how to probe.
    pub const ALL: [Flavor; 6] = [
        Flavor::Vanilla,
        Flavor::Forge,
        Flavor::Fabric,
        Flavor::NeoForge,
        Flavor::LiteLoader,
        Flavor::OptiFine,
    ];

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Flavor::Vanilla => "vanilla",
            Flavor::Forge => "forge",
            Flavor::Fabric => "fabric",
            Flavor::NeoForge => "neoforge",
            Flavor::LiteLoader => "liteloader",
            Flavor::OptiFine => "optifine",
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized flavor names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown flavor: {0}")]
pub struct UnknownFlavor(pub String);

impl FromStr for Flavor {
    type Err = UnknownFlavor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vanilla" => Ok(Flavor::Vanilla),
            "forge" => Ok(Flavor::Forge),
            "fabric" => Ok(Flavor::Fabric),
            "neoforge" => Ok(Flavor::NeoForge),
            "liteloader" => Ok(Flavor::LiteLoader),
            "optifine" => Ok(Flavor::OptiFine),
            _ => Err(UnknownFlavor(s.to_string())),
        }
    }
}

/// One concrete, addressable release of a flavor for a runtime version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    /// Opaque build identifier; syntax is flavor/provider-specific.
    pub id: String,
}

impl Build {
    /// Creates a build from its identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Integrity digest an upstream supplied for an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    /// Digest algorithm name, e.g. `"sha1"`.
    pub algorithm: &'static str,
    /// Lowercase hex digest value.
    pub value: String,
}

/// A resolved download location for one build.
///
/// Produced on demand from a build; never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    /// Concrete download URL.
    pub url: String,
    /// Human-meaningful filename encoding the (version, flavor, build) triple.
    pub suggested_file_name: String,
    /// Integrity digest, when the upstream supplies one.
    pub digest: Option<Digest>,
}

/// One upstream metadata/download source.
///
/// Listing operations fail soft: on transport or schema trouble they log,
/// emit an event, and return an empty result rather than raising. Probes
/// are independent per flavor and a failed probe simply omits that flavor.
///
/// # Object Safety
///
/// Uses `async_trait` so the engine can hold `Arc<dyn ServerProvider>`;
/// Rust 2024 native async traits are not object-safe.
#[async_trait]
pub trait ServerProvider: Send + Sync {
    /// The provider's registry name (e.g. `"bmclapi"`).
    fn name(&self) -> &'static str;

    /// Lists release-channel runtime versions, descending by release order.
    async fn list_runtime_versions(&self) -> Vec<RuntimeVersion>;

    /// Probes which flavors this provider offers for a runtime version.
    ///
    /// `vanilla` is always a member of the returned set.
    async fn probe_flavors(&self, version: &str) -> BTreeSet<Flavor>;

    /// Lists builds for a (version, flavor) pair, deduplicated and sorted
    /// strictly descending. Empty when the provider has nothing.
    async fn list_builds(&self, version: &str, flavor: Flavor) -> Vec<Build>;

    /// Resolves a build to a concrete artifact location.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotFound`] when the build id is stale or malformed
    /// for this provider; other variants on hard upstream failure.
    async fn resolve_artifact(
        &self,
        version: &str,
        flavor: Flavor,
        build_id: &str,
    ) -> Result<ArtifactLocation, ProviderError>;
}

/// Insertion-ordered collection of named providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ServerProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider. The first registered provider is the default
    /// active one.
    pub fn register(&mut self, provider: Arc<dyn ServerProvider>) {
        self.providers.push(provider);
    }

    /// Looks a provider up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ServerProvider>> {
        self.providers
            .iter()
            .find(|p| p.name() == name)
            .map(Arc::clone)
    }

    /// The first registered provider, if any.
    #[must_use]
    pub fn first(&self) -> Option<Arc<dyn ServerProvider>> {
        self.providers.first().map(Arc::clone)
    }

    /// Registered provider names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Iterates registered providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ServerProvider>> {
        self.providers.iter()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no providers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Builds the default provider registry: the BMCLAPI mirror first, the
/// official Mojang/Fabric source second.
///
/// A provider whose client fails to construct is skipped with a warning so
/// the rest stays usable.
#[must_use]
pub fn build_default_provider_registry(
    identity: Arc<dyn IdentityProvider>,
    events: EventBus,
) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    match MetaClient::new(identity, events) {
        Ok(client) => {
            registry.register(Arc::new(BmclapiProvider::new(client.clone())));
            registry.register(Arc::new(MojangProvider::new(client)));
        }
        Err(error) => warn!(
            error = %error,
            "metadata client unavailable; no providers registered"
        ),
    }

    registry
}

/// Deduplicates build ids on their lowercased form (first occurrence wins)
/// and sorts strictly descending by version key.
pub(crate) fn finalize_build_ids(ids: Vec<String>) -> Vec<Build> {
    let mut seen: HashSet<String> = HashSet::with_capacity(ids.len());
    let mut keyed: Vec<(VersionKey, String)> = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.insert(id.to_ascii_lowercase()) {
            keyed.push((VersionKey::parse(&id), id));
        }
    }
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, id)| Build::new(id)).collect()
}

/// Renders and orders Fabric loader/installer pairs.
///
/// The composite sorts by loader key first, installer key second, then is
/// deduplicated like any other build list.
pub(crate) fn finalize_fabric_builds(pairs: Vec<(String, String)>) -> Vec<Build> {
    let mut seen: HashSet<String> = HashSet::with_capacity(pairs.len());
    let mut keyed: Vec<((VersionKey, VersionKey), String)> = Vec::with_capacity(pairs.len());
    for (loader, installer) in pairs {
        let id = format!("loader-{loader}-installer-{installer}");
        if seen.insert(id.to_ascii_lowercase()) {
            keyed.push((
                (VersionKey::parse(&loader), VersionKey::parse(&installer)),
                id,
            ));
        }
    }
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, id)| Build::new(id)).collect()
}

/// Splits a Fabric composite build id back into (loader, installer) versions.
///
/// Returns `None` when the id does not match `loader-{l}-installer-{i}`.
pub(crate) fn parse_fabric_build_id(build_id: &str) -> Option<(&str, &str)> {
    let rest = build_id.strip_prefix("loader-")?;
    let (loader, installer) = rest.split_once("-installer-")?;
    if loader.is_empty() || installer.is_empty() {
        return None;
    }
    Some((loader, installer))
}

/// Sorts runtime versions descending by their parsed version key.
pub(crate) fn sort_versions_descending(versions: &mut [RuntimeVersion]) {
    versions.sort_by(|a, b| VersionKey::parse(&b.id).cmp(&VersionKey::parse(&a.id)));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_round_trips_through_display_and_from_str() {
        for flavor in Flavor::ALL {
            assert_eq!(flavor.to_string().parse::<Flavor>().unwrap(), flavor);
        }
    }

    #[test]
    fn test_flavor_from_str_is_case_insensitive() {
        assert_eq!("NeoForge".parse::<Flavor>().unwrap(), Flavor::NeoForge);
        assert_eq!("VANILLA".parse::<Flavor>().unwrap(), Flavor::Vanilla);
    }

    #[test]
    fn test_flavor_from_str_rejects_unknown() {
        let error = "bukkit".parse::<Flavor>().unwrap_err();
        assert_eq!(error, UnknownFlavor("bukkit".to_string()));
    }

    #[test]
    fn test_finalize_build_ids_dedupes_and_sorts_descending() {
        let builds = finalize_build_ids(vec![
            "47.1.12".to_string(),
            "47.1.13".to_string(),
            "47.1.12-beta".to_string(),
            "47.1.12".to_string(),
            "47.1.13".to_string(),
        ]);
        let ids: Vec<&str> = builds.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["47.1.13", "47.1.12", "47.1.12-beta"]);
    }

    #[test]
    fn test_finalize_build_ids_dedupes_case_variants() {
        let builds = finalize_build_ids(vec!["HD_U_I5".to_string(), "hd_u_i5".to_string()]);
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].id, "HD_U_I5");
    }

    #[test]
    fn test_finalize_fabric_builds_sorts_loader_first() {
        let builds = finalize_fabric_builds(vec![
            ("0.15.10".to_string(), "1.0.1".to_string()),
            ("0.15.11".to_string(), "0.11.2".to_string()),
            ("0.15.11".to_string(), "1.0.1".to_string()),
        ]);
        let ids: Vec<&str> = builds.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "loader-0.15.11-installer-1.0.1",
                "loader-0.15.11-installer-0.11.2",
                "loader-0.15.10-installer-1.0.1",
            ]
        );
    }

    #[test]
    fn test_parse_fabric_build_id_accepts_well_formed_ids() {
        assert_eq!(
            parse_fabric_build_id("loader-0.15.11-installer-1.0.1"),
            Some(("0.15.11", "1.0.1"))
        );
    }

    #[test]
    fn test_parse_fabric_build_id_rejects_malformed_ids() {
        assert_eq!(parse_fabric_build_id("0.15.11"), None);
        assert_eq!(parse_fabric_build_id("loader-0.15.11"), None);
        assert_eq!(parse_fabric_build_id("loader--installer-1.0.1"), None);
        assert_eq!(parse_fabric_build_id("installer-1.0.1-loader-0.15.11"), None);
    }

    #[test]
    fn test_sort_versions_descending() {
        let mut versions = vec![
            RuntimeVersion::release("1.19.4"),
            RuntimeVersion::release("1.20.1"),
            RuntimeVersion::release("1.8.9"),
        ];
        sort_versions_descending(&mut versions);
        let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["1.20.1", "1.19.4", "1.8.9"]);
    }

    #[test]
    fn test_registry_lookup_and_order() {
        use crate::identity::FixedIdentity;

        let client = MetaClient::new(
            Arc::new(FixedIdentity::new("test")),
            crate::events::EventBus::new(),
        )
        .unwrap();
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(BmclapiProvider::new(client.clone())));
        registry.register(Arc::new(MojangProvider::new(client)));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["bmclapi", "mojang"]);
        assert_eq!(registry.first().unwrap().name(), "bmclapi");
        assert_eq!(registry.get("mojang").unwrap().name(), "mojang");
        assert!(registry.get("papermc").is_none());
    }
}
