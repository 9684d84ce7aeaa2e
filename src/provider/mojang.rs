//! Official Mojang + Fabric meta adapter.
//!
//! The official manifest needs a second hop for vanilla: each version entry
//! carries a detail-document URL, and only the detail document holds the
//! server download URL and its sha1. Fabric comes straight from
//! `meta.fabricmc.net`. Forge/NeoForge/LiteLoader/OptiFine have no JSON
//! surface here, so those flavors are simply never probed present.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{
    ArtifactLocation, Build, Digest, Flavor, MetaClient, ProviderError, RuntimeVersion,
    ServerProvider, finalize_fabric_builds, parse_fabric_build_id, sort_versions_descending,
};

/// Production Mojang version-manifest base URL.
pub const DEFAULT_MANIFEST_BASE_URL: &str = "https://launchermeta.mojang.com";

/// Production Fabric meta base URL.
pub const DEFAULT_FABRIC_BASE_URL: &str = "https://meta.fabricmc.net";

// ==================== Mojang Response Types ====================

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<ManifestVersion>,
}

#[derive(Debug, Deserialize)]
struct ManifestVersion {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct VersionDetail {
    downloads: Option<VersionDownloads>,
}

#[derive(Debug, Deserialize)]
struct VersionDownloads {
    server: Option<ServerDownload>,
}

#[derive(Debug, Deserialize)]
struct ServerDownload {
    url: String,
    sha1: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FabricLoaderEntry {
    loader: Option<FabricLoaderRef>,
}

#[derive(Debug, Deserialize)]
struct FabricLoaderRef {
    version: String,
}

#[derive(Debug, Deserialize)]
struct FabricInstallerEntry {
    version: String,
}

// ==================== MojangProvider ====================

/// Adapter for the official Mojang and Fabric metadata services.
#[derive(Debug, Clone)]
pub struct MojangProvider {
    client: MetaClient,
    manifest_base_url: String,
    fabric_base_url: String,
}

impl MojangProvider {
    /// Creates the adapter against the production services.
    #[must_use]
    pub fn new(client: MetaClient) -> Self {
        Self::with_base_urls(client, DEFAULT_MANIFEST_BASE_URL, DEFAULT_FABRIC_BASE_URL)
    }

    /// Creates the adapter with custom base URLs (for testing with wiremock).
    #[must_use]
    pub fn with_base_urls(
        client: MetaClient,
        manifest_base_url: impl Into<String>,
        fabric_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            manifest_base_url: manifest_base_url.into(),
            fabric_base_url: fabric_base_url.into(),
        }
    }

    async fn fetch_manifest(&self) -> Option<VersionManifest> {
        let url = format!("{}/mc/game/version_manifest_v2.json", self.manifest_base_url);
        self.client.get_json_soft(&url, "the version manifest").await
    }

    async fn probe_fabric(&self, version: &str) -> Option<Flavor> {
        let url = format!("{}/v2/versions/loader/{version}", self.fabric_base_url);
        let loaders: Vec<FabricLoaderEntry> =
            self.client.get_json_soft(&url, "the Fabric loader list").await?;
        (!loaders.is_empty()).then_some(Flavor::Fabric)
    }

    async fn fabric_builds(&self, version: &str) -> Vec<Build> {
        let loader_url = format!("{}/v2/versions/loader/{version}", self.fabric_base_url);
        let installer_url = format!("{}/v2/versions/installer", self.fabric_base_url);

        let (loaders, installers) = tokio::join!(
            self.client
                .get_json_soft::<Vec<FabricLoaderEntry>>(&loader_url, "the Fabric loader list"),
            self.client.get_json_soft::<Vec<FabricInstallerEntry>>(
                &installer_url,
                "the Fabric installer list"
            ),
        );
        let (Some(loaders), Some(installers)) = (loaders, installers) else {
            return Vec::new();
        };

        let mut pairs = Vec::with_capacity(loaders.len() * installers.len());
        for loader in loaders.iter().filter_map(|l| l.loader.as_ref()) {
            for installer in &installers {
                pairs.push((loader.version.clone(), installer.version.clone()));
            }
        }
        finalize_fabric_builds(pairs)
    }

    async fn resolve_vanilla(
        &self,
        version: &str,
        build_id: &str,
    ) -> Result<ArtifactLocation, ProviderError> {
        // Vanilla is a single-build flavor; its only build id is the
        // runtime version itself.
        if build_id != version {
            return Err(ProviderError::not_found(version, "vanilla", build_id));
        }

        let manifest = self
            .fetch_manifest()
            .await
            .ok_or_else(|| ProviderError::not_found(version, "vanilla", build_id))?;
        let Some(entry) = manifest
            .versions
            .into_iter()
            .find(|v| v.id == version && v.kind == "release")
        else {
            return Err(ProviderError::not_found(version, "vanilla", build_id));
        };

        // The detail hop recovers like the manifest hop: logged, degraded
        // to the resolution-miss outcome, never a raw transport error.
        let detail: VersionDetail = self
            .client
            .get_json_soft(&entry.url, "the version detail document")
            .await
            .ok_or_else(|| ProviderError::not_found(version, "vanilla", build_id))?;
        let Some(server) = detail.downloads.and_then(|d| d.server) else {
            self.client
                .events()
                .log(format!("Mojang lists no server download for {version}"));
            return Err(ProviderError::not_found(version, "vanilla", build_id));
        };

        Ok(ArtifactLocation {
            url: server.url,
            suggested_file_name: format!("minecraft_server-{version}.jar"),
            digest: server.sha1.map(|value| Digest {
                algorithm: "sha1",
                value,
            }),
        })
    }
}

#[async_trait]
impl ServerProvider for MojangProvider {
    fn name(&self) -> &'static str {
        "mojang"
    }

    async fn list_runtime_versions(&self) -> Vec<RuntimeVersion> {
        let Some(manifest) = self.fetch_manifest().await else {
            return Vec::new();
        };
        let mut versions: Vec<RuntimeVersion> = manifest
            .versions
            .into_iter()
            .filter(|v| v.kind == "release")
            .map(|v| RuntimeVersion::release(v.id))
            .collect();
        sort_versions_descending(&mut versions);
        self.client.events().log(format!(
            "Fetched {} release versions from Mojang",
            versions.len()
        ));
        versions
    }

    async fn probe_flavors(&self, version: &str) -> BTreeSet<Flavor> {
        debug!(version, "probing flavor availability");
        let mut flavors = BTreeSet::new();
        flavors.insert(Flavor::Vanilla);
        if let Some(fabric) = self.probe_fabric(version).await {
            flavors.insert(fabric);
        }
        flavors
    }

    async fn list_builds(&self, version: &str, flavor: Flavor) -> Vec<Build> {
        debug!(version, %flavor, "listing builds");
        match flavor {
            Flavor::Vanilla => {
                let Some(manifest) = self.fetch_manifest().await else {
                    return Vec::new();
                };
                let listed = manifest
                    .versions
                    .iter()
                    .any(|v| v.id == version && v.kind == "release");
                if listed {
                    vec![Build::new(version)]
                } else {
                    self.client
                        .events()
                        .log(format!("No vanilla server build found for {version}"));
                    Vec::new()
                }
            }
            Flavor::Fabric => self.fabric_builds(version).await,
            other => {
                self.client
                    .events()
                    .log(format!("Mojang source does not offer {other} builds"));
                Vec::new()
            }
        }
    }

    async fn resolve_artifact(
        &self,
        version: &str,
        flavor: Flavor,
        build_id: &str,
    ) -> Result<ArtifactLocation, ProviderError> {
        match flavor {
            Flavor::Vanilla => self.resolve_vanilla(version, build_id).await,
            Flavor::Fabric => {
                let Some((loader, installer)) = parse_fabric_build_id(build_id) else {
                    return Err(ProviderError::not_found(version, flavor.as_str(), build_id));
                };
                Ok(ArtifactLocation {
                    url: format!(
                        "{}/v2/versions/loader/{version}/{loader}/{installer}/server/jar",
                        self.fabric_base_url
                    ),
                    suggested_file_name: format!(
                        "fabric-server-mc.{version}-loader.{loader}-installer.{installer}.jar"
                    ),
                    digest: None,
                })
            }
            other => Err(ProviderError::not_found(version, other.as_str(), build_id)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_download_parses_with_and_without_sha1() {
        let with: ServerDownload = serde_json::from_str(
            r#"{"url": "https://example.com/server.jar", "sha1": "abc123", "size": 1}"#,
        )
        .unwrap();
        assert_eq!(with.sha1.as_deref(), Some("abc123"));

        let without: ServerDownload =
            serde_json::from_str(r#"{"url": "https://example.com/server.jar"}"#).unwrap();
        assert!(without.sha1.is_none());
    }

    #[test]
    fn test_version_detail_tolerates_missing_downloads() {
        let detail: VersionDetail = serde_json::from_str("{}").unwrap();
        assert!(detail.downloads.is_none());
    }
}
