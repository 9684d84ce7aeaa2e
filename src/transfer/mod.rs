//! Transfer executor: streamed download with atomic publish.
//!
//! Protocol per transfer: HEAD pre-check (abort before touching disk on a
//! miss), optional size probe from `Content-Length`, streamed write to a
//! `.part` temp file in the destination directory with monotone progress
//! events, then an atomic rename to the final name. Any failure removes
//! the temp file and emits a failure outcome; the final destination name
//! only ever appears for a complete artifact.
//!
//! A destination path is an exclusive resource: a second download against
//! a path already in flight is rejected immediately, never interleaved.

mod error;

pub use error::TransferError;

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::events::EventBus;
use crate::provider::ArtifactLocation;

const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Generous read timeout; server jars run to hundreds of megabytes.
const READ_TIMEOUT_SECS: u64 = 600;

/// Suffix for the in-progress temp file next to the final destination.
const PART_SUFFIX: &str = ".part";

/// Executes artifact downloads with progress reporting and atomic publish.
///
/// Create once and reuse; the inner client pools connections and the
/// executor tracks in-flight destination paths across all callers.
#[derive(Debug)]
pub struct TransferExecutor {
    client: Client,
    events: EventBus,
    in_flight: DashMap<PathBuf, ()>,
}

impl TransferExecutor {
    /// Creates a transfer executor reporting through `events`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(events: EventBus) -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(READ_TIMEOUT_SECS))
            .user_agent(format!("coreget/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            events,
            in_flight: DashMap::new(),
        }
    }

    /// Downloads a resolved artifact to `<dest_dir>/<dest_name>`.
    ///
    /// Emits `Progress` events while streaming and exactly one `Done`
    /// event for the executed transfer. A rejection due to an in-flight
    /// transfer on the same destination emits no `Done` event.
    ///
    /// Cancellation is cooperative: `cancel` is checked between stream
    /// chunks and counts as a failure (temp file removed).
    ///
    /// # Errors
    ///
    /// [`TransferError::DestinationBusy`] on same-destination contention;
    /// [`TransferError::NotSynced`] when the pre-check misses; network and
    /// IO variants on mid-transfer failure. On any error the destination
    /// file does not exist.
    #[instrument(skip(self, location, cancel), fields(url = %location.url, dest = %dest_dir.join(dest_name).display()))]
    pub async fn download(
        &self,
        location: &ArtifactLocation,
        dest_dir: &Path,
        dest_name: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        Url::parse(&location.url).map_err(|_| TransferError::invalid_url(&location.url))?;

        let final_path = dest_dir.join(dest_name);
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, final_path.clone()) else {
            warn!(path = %final_path.display(), "rejecting concurrent transfer to busy destination");
            return Err(TransferError::destination_busy(final_path));
        };

        let result = self
            .run(location, dest_dir, dest_name, &final_path, cancel)
            .await;
        match &result {
            Ok(path) => {
                self.events
                    .log(format!("Download complete: {}", path.display()));
                self.events.done(path.display().to_string(), true);
            }
            Err(error) => {
                warn!(error = %error, "transfer failed");
                self.events.log(format!("Download failed: {error}"));
                self.events.done("", false);
            }
        }
        result
    }

    async fn run(
        &self,
        location: &ArtifactLocation,
        dest_dir: &Path,
        dest_name: &str,
        final_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TransferError> {
        let url = location.url.as_str();

        // Existence pre-check: nothing touches disk on a miss.
        let head = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| TransferError::network(url, e))?;
        if !head.status().is_success() {
            self.events
                .log(format!("File not found or not yet synced: {url}"));
            return Err(TransferError::not_synced(url, head.status().as_u16()));
        }
        let mut expected_size = content_length_of(head.headers());

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| TransferError::io(dest_dir, e))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransferError::network(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::not_synced(url, status.as_u16()));
        }
        if expected_size.is_none() {
            expected_size = content_length_of(response.headers());
        }
        debug!(?expected_size, "starting streamed transfer");

        let temp_path = dest_dir.join(format!("{dest_name}{PART_SUFFIX}"));
        let mut file = File::create(&temp_path)
            .await
            .map_err(|e| TransferError::io(temp_path.clone(), e))?;

        self.events.progress(0);
        let streamed = self
            .stream_body(response, &mut file, &temp_path, url, expected_size, cancel)
            .await;
        drop(file);

        let received = match streamed {
            Ok(bytes) => bytes,
            Err(error) => {
                // The temp file must not be mistaken for a completed artifact.
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(error);
            }
        };

        if let Err(error) = tokio::fs::rename(&temp_path, final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(TransferError::io(final_path, error));
        }

        self.events.progress(100);
        info!(
            path = %final_path.display(),
            bytes = received,
            "transfer complete"
        );
        Ok(final_path.to_path_buf())
    }

    async fn stream_body(
        &self,
        response: reqwest::Response,
        file: &mut File,
        temp_path: &Path,
        url: &str,
        expected_size: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;
        let mut last_percent: u8 = 0;

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                return Err(TransferError::cancelled(url));
            }
            let chunk = chunk.map_err(|e| TransferError::network(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TransferError::io(temp_path, e))?;
            received = received.saturating_add(chunk.len() as u64);

            if let Some(total) = expected_size {
                let percent = percent_of(received, total);
                if percent > last_percent {
                    last_percent = percent;
                    self.events.progress(percent);
                }
            }
            // Without a size the percentage stays at 0 until completion.
        }

        file.flush()
            .await
            .map_err(|e| TransferError::io(temp_path, e))?;
        Ok(received)
    }
}

fn content_length_of(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|n| *n > 0)
}

/// Cumulative progress percentage, capped at 100.
fn percent_of(received: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = received.saturating_mul(100) / total;
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// RAII exclusivity guard over a destination path.
struct InFlightGuard<'a> {
    map: &'a DashMap<PathBuf, ()>,
    path: PathBuf,
}

impl<'a> InFlightGuard<'a> {
    /// Claims the path, or returns `None` when a transfer already holds it.
    fn acquire(map: &'a DashMap<PathBuf, ()>, path: PathBuf) -> Option<Self> {
        use dashmap::mapref::entry::Entry;
        match map.entry(path.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(Self { map, path })
            }
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.path);
    }
}
