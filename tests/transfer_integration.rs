//! Integration tests for the transfer executor against a stubbed artifact
//! server, exercising the pre-check, atomic publish, and contention rules.

use std::time::Duration;

use coreget_core::{ArtifactLocation, Event, EventBus, TransferError, TransferExecutor};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &[u8] = b"not actually a server jar, but 42 bytes of it";

fn location(url: String) -> ArtifactLocation {
    ArtifactLocation {
        url,
        suggested_file_name: "server.jar".to_string(),
        digest: None,
    }
}

/// Mounts one mock answering both the HEAD pre-check and the GET.
async fn mount_artifact(server: &MockServer) {
    Mock::given(path("/server.jar"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(BODY))
        .mount(server)
        .await;
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_successful_transfer_publishes_final_file_and_removes_temp() {
    let server = MockServer::start().await;
    mount_artifact(&server).await;

    let events = EventBus::new();
    let mut rx = events.subscribe();
    let executor = TransferExecutor::new(events);
    let dir = tempfile::tempdir().unwrap();

    let saved = executor
        .download(
            &location(format!("{}/server.jar", server.uri())),
            dir.path(),
            "server.jar",
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(saved, dir.path().join("server.jar"));
    assert_eq!(std::fs::read(&saved).unwrap(), BODY);
    assert!(
        !dir.path().join("server.jar.part").exists(),
        "temp file must be gone after publish"
    );

    let seen = drain(&mut rx);
    let progress: Vec<u8> = seen
        .iter()
        .filter_map(|e| match e {
            Event::Progress(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "in: {progress:?}");
    assert_eq!(progress.last(), Some(&100));
    match seen.last().unwrap() {
        Event::Done { path, success } => {
            assert!(*success);
            assert_eq!(path, &saved.display().to_string());
        }
        other => panic!("expected terminal done event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_precheck_miss_touches_no_disk() {
    let server = MockServer::start().await;
    // Nothing mounted: the HEAD pre-check gets a 404.

    let events = EventBus::new();
    let mut rx = events.subscribe();
    let executor = TransferExecutor::new(events);
    let dir = tempfile::tempdir().unwrap();
    let dest_dir = dir.path().join("not-yet-created");

    let error = executor
        .download(
            &location(format!("{}/server.jar", server.uri())),
            &dest_dir,
            "server.jar",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, TransferError::NotSynced { status: 404, .. }));
    assert!(
        !dest_dir.exists(),
        "a failed pre-check must not create the destination directory"
    );

    let seen = drain(&mut rx);
    assert!(seen.iter().any(|e| matches!(
        e,
        Event::Log(line) if line.contains("not found or not yet synced")
    )));
    match seen.last().unwrap() {
        Event::Done { path, success } => {
            assert!(!*success);
            assert!(path.is_empty());
        }
        other => panic!("expected terminal done event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_get_after_successful_precheck_leaves_no_file() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/server.jar"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/server.jar"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let executor = TransferExecutor::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();

    let error = executor
        .download(
            &location(format!("{}/server.jar", server.uri())),
            dir.path(),
            "server.jar",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, TransferError::NotSynced { status: 503, .. }));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(leftovers.is_empty(), "found: {leftovers:?}");
}

#[tokio::test]
async fn test_cancellation_removes_the_partial_file() {
    let server = MockServer::start().await;
    mount_artifact(&server).await;

    let executor = TransferExecutor::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = executor
        .download(
            &location(format!("{}/server.jar", server.uri())),
            dir.path(),
            "server.jar",
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, TransferError::Cancelled { .. }));
    assert!(!dir.path().join("server.jar").exists());
    assert!(!dir.path().join("server.jar.part").exists());
}

#[tokio::test]
async fn test_concurrent_transfers_to_same_destination_reject_the_second() {
    let server = MockServer::start().await;
    Mock::given(path("/server.jar"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(BODY)
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let events = EventBus::new();
    let mut rx = events.subscribe();
    let executor = TransferExecutor::new(events);
    let dir = tempfile::tempdir().unwrap();
    let artifact = location(format!("{}/server.jar", server.uri()));
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        executor.download(&artifact, dir.path(), "server.jar", &cancel),
        executor.download(&artifact, dir.path(), "server.jar", &cancel),
    );

    let (winner, loser) = match (first, second) {
        (Ok(path), Err(error)) | (Err(error), Ok(path)) => (path, error),
        other => panic!("expected one winner and one rejection, got {other:?}"),
    };
    assert!(matches!(loser, TransferError::DestinationBusy { .. }));
    assert_eq!(std::fs::read(&winner).unwrap(), BODY);

    // The rejected transfer never executed, so exactly one outcome event.
    let done_count = drain(&mut rx)
        .iter()
        .filter(|e| matches!(e, Event::Done { .. }))
        .count();
    assert_eq!(done_count, 1);
}

#[tokio::test]
async fn test_concurrent_transfers_to_different_destinations_both_succeed() {
    let server = MockServer::start().await;
    mount_artifact(&server).await;

    let executor = TransferExecutor::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();
    let artifact = location(format!("{}/server.jar", server.uri()));
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        executor.download(&artifact, dir.path(), "alpha.jar", &cancel),
        executor.download(&artifact, dir.path(), "beta.jar", &cancel),
    );

    assert_eq!(std::fs::read(first.unwrap()).unwrap(), BODY);
    assert_eq!(std::fs::read(second.unwrap()).unwrap(), BODY);
}

#[tokio::test]
async fn test_destination_is_reusable_after_a_completed_transfer() {
    let server = MockServer::start().await;
    mount_artifact(&server).await;

    let executor = TransferExecutor::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();
    let artifact = location(format!("{}/server.jar", server.uri()));
    let cancel = CancellationToken::new();

    let first = executor
        .download(&artifact, dir.path(), "server.jar", &cancel)
        .await
        .unwrap();
    let second = executor
        .download(&artifact, dir.path(), "server.jar", &cancel)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_malformed_url_is_rejected_before_any_network_io() {
    let executor = TransferExecutor::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();

    let error = executor
        .download(
            &location("not a url at all".to_string()),
            dir.path(),
            "server.jar",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(error, TransferError::InvalidUrl { .. }));
}
