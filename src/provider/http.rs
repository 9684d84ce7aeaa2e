//! Shared HTTP client policy for metadata providers.
//!
//! Centralizes timeout, user-agent, compression, and the per-installation
//! identity header so adapters stay consistent, plus the fail-soft JSON
//! fetch helper all adapters report through.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::events::EventBus;
use crate::identity::IdentityProvider;

use super::ProviderError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Header carrying the per-installation identity on every metadata request.
pub const IDENTITY_HEADER: &str = "x-client-id";

fn default_user_agent() -> String {
    format!("coreget/{}", env!("CARGO_PKG_VERSION"))
}

/// HTTP client shared by all provider adapters.
///
/// Cloning is cheap (the inner reqwest client pools connections) and all
/// clones report through the same [`EventBus`].
#[derive(Clone)]
pub struct MetaClient {
    client: Client,
    identity: Arc<dyn IdentityProvider>,
    events: EventBus,
}

impl fmt::Debug for MetaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaClient").finish_non_exhaustive()
    }
}

impl MetaClient {
    /// Builds the shared metadata client.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Schema`] if reqwest client construction
    /// fails (invalid TLS backend configuration and the like).
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        events: EventBus,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .user_agent(default_user_agent())
            .gzip(true)
            .build()
            .map_err(|e| {
                ProviderError::schema("client construction", format!("HTTP client build: {e}"))
            })?;

        Ok(Self {
            client,
            identity,
            events,
        })
    }

    /// The event bus this client reports soft failures through.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Fetches a JSON document, attaching the identity header.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] on network failure,
    /// [`ProviderError::Status`] on non-2xx, and [`ProviderError::Schema`]
    /// when the body does not deserialize as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .header(IDENTITY_HEADER, self.identity.installation_id())
            .send()
            .await
            .map_err(|e| ProviderError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::status(url, status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::schema(url, e.to_string()))
    }

    /// Fail-soft JSON fetch: any failure is logged, reported on the event
    /// bus, and degraded to `None` so listing operations never raise.
    ///
    /// `subject` names what was being fetched, for the log line.
    pub async fn get_json_soft<T: DeserializeOwned>(&self, url: &str, subject: &str) -> Option<T> {
        match self.get_json(url).await {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(url = %url, error = %error, "metadata fetch failed");
                self.events.log(format!("Failed to fetch {subject}: {error}"));
                None
            }
        }
    }
}
