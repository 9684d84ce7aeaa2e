//! BMCLAPI mirror adapter.
//!
//! BMCLAPI serves one metadata surface per flavor, each with its own shape:
//! a single manifest document for vanilla, per-version endpoints for Forge
//! and NeoForge, a query-string endpoint for LiteLoader, a typed patch list
//! for OptiFine, and a loader/installer cross-product for Fabric. All of
//! that variance stays behind the [`ServerProvider`] operations.
//!
//! Fabric server jars are not mirrored, so `resolve_artifact` for Fabric
//! addresses the official meta service directly.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{
    ArtifactLocation, Build, Flavor, MetaClient, ProviderError, RuntimeVersion, ServerProvider,
    finalize_build_ids, finalize_fabric_builds, parse_fabric_build_id, sort_versions_descending,
};

/// Production BMCLAPI base URL.
pub const DEFAULT_BASE_URL: &str = "https://bmclapi2.bangbang93.com";

/// Fabric server jars come from the official meta service, not the mirror.
const FABRIC_DOWNLOAD_BASE_URL: &str = "https://meta.fabricmc.net";

// ==================== BMCLAPI Response Types ====================

#[derive(Debug, Deserialize)]
struct VersionManifest {
    versions: Vec<ManifestVersion>,
}

#[derive(Debug, Deserialize)]
struct ManifestVersion {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ForgeBuild {
    version: String,
}

/// One entry of the Fabric loader list. The mirror has served both a nested
/// `{"loader": {"version": ...}}` shape and a flat `{"version": ...}` one.
#[derive(Debug, Deserialize)]
struct FabricLoaderEntry {
    loader: Option<FabricComponent>,
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FabricComponent {
    Detailed { version: String },
    Plain(String),
}

impl FabricLoaderEntry {
    fn loader_version(&self) -> Option<&str> {
        match &self.loader {
            Some(FabricComponent::Detailed { version }) => Some(version),
            Some(FabricComponent::Plain(version)) => Some(version),
            None => self.version.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FabricInstallerEntry {
    version: String,
}

#[derive(Debug, Deserialize)]
struct NeoforgeEntry {
    #[serde(rename = "rawVersion")]
    raw_version: String,
}

#[derive(Debug, Deserialize)]
struct LiteloaderEntry {
    version: String,
}

#[derive(Debug, Deserialize)]
struct OptifineEntry {
    #[serde(rename = "type")]
    kind: String,
    patch: String,
}

/// Truthiness check for probe endpoints whose exact shape drifts: any
/// non-empty array/object counts as "this flavor exists here".
fn has_content(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

// ==================== BmclapiProvider ====================

/// Adapter for the BMCLAPI mirror.
#[derive(Debug, Clone)]
pub struct BmclapiProvider {
    client: MetaClient,
    base_url: String,
    fabric_download_base_url: String,
}

impl BmclapiProvider {
    /// Creates the adapter against the production mirror.
    #[must_use]
    pub fn new(client: MetaClient) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Creates the adapter with a custom base URL (for testing with wiremock).
    ///
    /// Fabric artifact URLs are rooted at the same base in that case so
    /// tests can stub them too.
    #[must_use]
    pub fn with_base_url(client: MetaClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let fabric_download_base_url = if base_url == DEFAULT_BASE_URL {
            FABRIC_DOWNLOAD_BASE_URL.to_string()
        } else {
            base_url.clone()
        };
        Self {
            client,
            base_url,
            fabric_download_base_url,
        }
    }

    async fn fetch_manifest(&self) -> Option<VersionManifest> {
        let url = format!("{}/mc/game/version_manifest_v2.json", self.base_url);
        self.client.get_json_soft(&url, "the version manifest").await
    }

    async fn probe_forge(&self, version: &str) -> Option<Flavor> {
        let url = format!("{}/forge/minecraft", self.base_url);
        let supported: Vec<String> = self.client.get_json_soft(&url, "the Forge version list").await?;
        supported
            .iter()
            .any(|v| v == version)
            .then_some(Flavor::Forge)
    }

    async fn probe_fabric(&self, version: &str) -> Option<Flavor> {
        let url = format!(
            "{}/fabric-meta/v2/versions/loader/{version}",
            self.base_url
        );
        let loaders: Vec<FabricLoaderEntry> =
            self.client.get_json_soft(&url, "the Fabric loader list").await?;
        (!loaders.is_empty()).then_some(Flavor::Fabric)
    }

    async fn probe_neoforge(&self, version: &str) -> Option<Flavor> {
        let url = format!("{}/neoforge/list/{version}", self.base_url);
        let listing: serde_json::Value =
            self.client.get_json_soft(&url, "the NeoForge list").await?;
        has_content(&listing).then_some(Flavor::NeoForge)
    }

    async fn probe_liteloader(&self, version: &str) -> Option<Flavor> {
        let url = format!(
            "{}/liteloader/list?mcversion={}",
            self.base_url,
            urlencoding::encode(version)
        );
        let listing: serde_json::Value =
            self.client.get_json_soft(&url, "the LiteLoader list").await?;
        has_content(&listing).then_some(Flavor::LiteLoader)
    }

    async fn probe_optifine(&self, version: &str) -> Option<Flavor> {
        let url = format!("{}/optifine/{version}", self.base_url);
        let listing: serde_json::Value =
            self.client.get_json_soft(&url, "the OptiFine list").await?;
        has_content(&listing).then_some(Flavor::OptiFine)
    }

    async fn vanilla_builds(&self, version: &str) -> Vec<Build> {
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

    async fn forge_builds(&self, version: &str) -> Vec<Build> {
        let url = format!("{}/forge/minecraft/{version}", self.base_url);
        let Some(builds): Option<Vec<ForgeBuild>> =
            self.client.get_json_soft(&url, "the Forge build list").await
        else {
            return Vec::new();
        };
        finalize_build_ids(builds.into_iter().map(|b| b.version).collect())
    }

    async fn fabric_builds(&self, version: &str) -> Vec<Build> {
        let loader_url = format!(
            "{}/fabric-meta/v2/versions/loader/{version}",
            self.base_url
        );
        let installer_url = format!("{}/fabric-meta/v2/versions/installer", self.base_url);

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
        if loaders.is_empty() || installers.is_empty() {
            self.client
                .events()
                .log(format!("No Fabric loader or installer versions for {version}"));
            return Vec::new();
        }

        let mut pairs = Vec::with_capacity(loaders.len() * installers.len());
        for loader in &loaders {
            let Some(loader_version) = loader.loader_version() else {
                continue;
            };
            for installer in &installers {
                pairs.push((loader_version.to_string(), installer.version.clone()));
            }
        }
        finalize_fabric_builds(pairs)
    }

    async fn neoforge_builds(&self, version: &str) -> Vec<Build> {
        let url = format!("{}/neoforge/list/{version}", self.base_url);
        let Some(entries): Option<Vec<NeoforgeEntry>> =
            self.client.get_json_soft(&url, "the NeoForge build list").await
        else {
            return Vec::new();
        };
        finalize_build_ids(entries.into_iter().map(|e| e.raw_version).collect())
    }

    async fn liteloader_builds(&self, version: &str) -> Vec<Build> {
        let url = format!(
            "{}/liteloader/list?mcversion={}",
            self.base_url,
            urlencoding::encode(version)
        );
        let Some(entries): Option<Vec<LiteloaderEntry>> =
            self.client.get_json_soft(&url, "the LiteLoader build list").await
        else {
            return Vec::new();
        };
        finalize_build_ids(entries.into_iter().map(|e| e.version).collect())
    }

    async fn optifine_builds(&self, version: &str) -> Vec<Build> {
        let url = format!("{}/optifine/{version}", self.base_url);
        let Some(entries): Option<Vec<OptifineEntry>> =
            self.client.get_json_soft(&url, "the OptiFine build list").await
        else {
            return Vec::new();
        };
        finalize_build_ids(
            entries
                .into_iter()
                .map(|e| format!("{}_{}", e.kind, e.patch))
                .collect(),
        )
    }
}

#[async_trait]
impl ServerProvider for BmclapiProvider {
    fn name(&self) -> &'static str {
        "bmclapi"
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
            "Fetched {} release versions from BMCLAPI",
            versions.len()
        ));
        versions
    }

    async fn probe_flavors(&self, version: &str) -> BTreeSet<Flavor> {
        debug!(version, "probing flavor availability");
        let (forge, fabric, neoforge, liteloader, optifine) = tokio::join!(
            self.probe_forge(version),
            self.probe_fabric(version),
            self.probe_neoforge(version),
            self.probe_liteloader(version),
            self.probe_optifine(version),
        );

        let mut flavors = BTreeSet::new();
        flavors.insert(Flavor::Vanilla);
        for flavor in [forge, fabric, neoforge, liteloader, optifine]
            .into_iter()
            .flatten()
        {
            flavors.insert(flavor);
        }
        flavors
    }

    async fn list_builds(&self, version: &str, flavor: Flavor) -> Vec<Build> {
        debug!(version, %flavor, "listing builds");
        match flavor {
            Flavor::Vanilla => self.vanilla_builds(version).await,
            Flavor::Forge => self.forge_builds(version).await,
            Flavor::Fabric => self.fabric_builds(version).await,
            Flavor::NeoForge => self.neoforge_builds(version).await,
            Flavor::LiteLoader => self.liteloader_builds(version).await,
            Flavor::OptiFine => self.optifine_builds(version).await,
        }
    }

    async fn resolve_artifact(
        &self,
        version: &str,
        flavor: Flavor,
        build_id: &str,
    ) -> Result<ArtifactLocation, ProviderError> {
        let location = match flavor {
            Flavor::Vanilla => ArtifactLocation {
                url: format!("{}/version/{version}/server/", self.base_url),
                suggested_file_name: format!("minecraft_server-{version}.jar"),
                digest: None,
            },
            Flavor::Forge => ArtifactLocation {
                url: format!(
                    "{}/forge/download?mcversion={}&version={}&category=installer&format=jar",
                    self.base_url,
                    urlencoding::encode(version),
                    urlencoding::encode(build_id),
                ),
                suggested_file_name: format!("forge-{version}-{build_id}-installer.jar"),
                digest: None,
            },
            Flavor::Fabric => {
                let Some((loader, installer)) = parse_fabric_build_id(build_id) else {
                    self.client.events().log(format!(
                        "Fabric build id {build_id} is malformed; cannot build a download URL"
                    ));
                    return Err(ProviderError::not_found(version, flavor.as_str(), build_id));
                };
                ArtifactLocation {
                    url: format!(
                        "{}/v2/versions/loader/{version}/{loader}/{installer}/server/jar",
                        self.fabric_download_base_url
                    ),
                    suggested_file_name: format!(
                        "fabric-server-mc.{version}-loader.{loader}-installer.{installer}.jar"
                    ),
                    digest: None,
                }
            }
            Flavor::NeoForge => {
                let neoforge_version = build_id.strip_prefix("neoforge-").unwrap_or(build_id);
                ArtifactLocation {
                    url: format!(
                        "{}/neoforge/version/{neoforge_version}/download/installer.jar",
                        self.base_url
                    ),
                    suggested_file_name: format!(
                        "neoforge-{version}-{neoforge_version}-installer.jar"
                    ),
                    digest: None,
                }
            }
            Flavor::LiteLoader => ArtifactLocation {
                url: format!(
                    "{}/maven/com/mumfrey/liteloader/{build_id}/liteloader-{build_id}.jar",
                    self.base_url
                ),
                suggested_file_name: format!("liteloader-{version}-{build_id}.jar"),
                digest: None,
            },
            Flavor::OptiFine => {
                let Some((kind, patch)) = build_id.split_once('_') else {
                    return Err(ProviderError::not_found(version, flavor.as_str(), build_id));
                };
                ArtifactLocation {
                    url: format!("{}/optifine/{version}/{kind}/{patch}", self.base_url),
                    suggested_file_name: format!("optifine-{version}-{build_id}.jar"),
                    digest: None,
                }
            }
        };

        self.client.events().log(format!(
            "Resolved {flavor} {build_id} for {version}: {}",
            location.url
        ));
        Ok(location)
    }
}
