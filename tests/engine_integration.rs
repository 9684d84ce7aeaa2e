//! End-to-end engine tests over wiremock-backed provider adapters.

use std::sync::Arc;

use coreget_core::{
    BmclapiProvider, EngineError, EventBus, FixedIdentity, Flavor, MetaClient, MojangProvider,
    ProviderRegistry, ResolutionEngine,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn meta_client() -> MetaClient {
    MetaClient::new(Arc::new(FixedIdentity::new("itest")), EventBus::new()).unwrap()
}

async fn mount_manifest(server: &MockServer, release_ids: &[&str]) {
    let versions: Vec<serde_json::Value> = release_ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "type": "release",
                "url": format!("{}/v1/packages/0/{id}.json", server.uri()),
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/mc/game/version_manifest_v2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"versions": versions})))
        .mount(server)
        .await;
}

/// Mirror on `mirror`, official source on `official`, mirror active first.
fn engine_over(mirror: &MockServer, official: &MockServer) -> ResolutionEngine {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(BmclapiProvider::with_base_url(
        meta_client(),
        mirror.uri(),
    )));
    registry.register(Arc::new(MojangProvider::with_base_urls(
        meta_client(),
        official.uri(),
        official.uri(),
    )));
    ResolutionEngine::new(registry).unwrap()
}

#[tokio::test]
async fn test_aggregate_listing_unions_both_sources() {
    let mirror = MockServer::start().await;
    let official = MockServer::start().await;
    mount_manifest(&mirror, &["1.20.1", "1.19.4"]).await;
    mount_manifest(&official, &["1.21", "1.20.1"]).await;

    let engine = engine_over(&mirror, &official);
    assert!(engine.aggregate());

    let versions = engine.list_runtime_versions().await;
    let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, vec!["1.21", "1.20.1", "1.19.4"]);
}

#[tokio::test]
async fn test_aggregate_listing_survives_one_source_being_down() {
    let mirror = MockServer::start().await;
    let official = MockServer::start().await;
    mount_manifest(&mirror, &["1.20.1"]).await;
    // The official source serves nothing and 404s.

    let engine = engine_over(&mirror, &official);
    let versions = engine.list_runtime_versions().await;
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].id, "1.20.1");
}

#[tokio::test]
async fn test_build_listing_follows_the_active_provider() {
    let mirror = MockServer::start().await;
    let official = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forge/minecraft/1.20.1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"version": "47.1.13"}])),
        )
        .mount(&mirror)
        .await;

    let engine = engine_over(&mirror, &official);
    assert_eq!(engine.active_provider_name(), "bmclapi");

    let builds = engine.list_builds("1.20.1", Flavor::Forge).await;
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].id, "47.1.13");

    // The official source has no Forge surface at all.
    engine.switch_provider("mojang").unwrap();
    let builds = engine.list_builds("1.20.1", Flavor::Forge).await;
    assert!(builds.is_empty());
}

#[tokio::test]
async fn test_resolution_follows_the_active_provider() {
    let mirror = MockServer::start().await;
    let official = MockServer::start().await;

    let engine = engine_over(&mirror, &official);
    let location = engine
        .resolve_artifact("1.20.1", Flavor::Forge, "47.1.13")
        .await
        .unwrap();
    assert!(location.url.starts_with(&mirror.uri()));

    engine.switch_provider("mojang").unwrap();
    let error = engine
        .resolve_artifact("1.20.1", Flavor::Forge, "47.1.13")
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_switching_to_an_unknown_provider_is_rejected() {
    let mirror = MockServer::start().await;
    let official = MockServer::start().await;

    let engine = engine_over(&mirror, &official);
    let error = engine.switch_provider("papermc").unwrap_err();
    assert!(matches!(error, EngineError::UnknownProvider(name) if name == "papermc"));
    assert_eq!(engine.active_provider_name(), "bmclapi");
}
