//! Error types for provider metadata operations.
//!
//! Transport, status, and schema failures are recovered locally by the
//! adapters (logged, degraded to empty results); only [`ProviderError::NotFound`]
//! reaches the caller as the legitimate resolution-miss outcome.

use thiserror::Error;

/// Errors raised while talking to an upstream metadata provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure reaching the upstream (DNS, connect, TLS, timeout).
    #[error("transport error fetching {url}: {source}")]
    Transport {
        /// The metadata URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Upstream answered with a non-success HTTP status.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// The metadata URL that failed.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Upstream JSON was missing expected fields or of unexpected shape.
    #[error("unexpected payload from {url}: {detail}")]
    Schema {
        /// The metadata URL whose payload did not parse.
        url: String,
        /// What failed to parse.
        detail: String,
    },

    /// A structurally valid request with no corresponding upstream entry.
    ///
    /// Expected when the caller holds a stale selection or races an
    /// upstream removal; not a transport problem.
    #[error("no artifact for {version} {flavor} build {build}")]
    NotFound {
        /// The runtime version that was requested.
        version: String,
        /// The flavor that was requested.
        flavor: String,
        /// The build id that could not be resolved.
        build: String,
    },
}

impl ProviderError {
    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a schema error.
    pub fn schema(url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Schema {
            url: url.into(),
            detail: detail.into(),
        }
    }

    /// Creates a resolution-miss error.
    pub fn not_found(
        version: impl Into<String>,
        flavor: impl Into<String>,
        build: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            version: version.into(),
            flavor: flavor.into(),
            build: build.into(),
        }
    }

    /// True when this is the legitimate "nothing upstream" outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let error = ProviderError::status("https://example.com/manifest.json", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "expected status in: {msg}");
        assert!(msg.contains("manifest.json"), "expected url in: {msg}");
    }

    #[test]
    fn test_schema_error_display() {
        let error = ProviderError::schema("https://example.com/list", "missing field `version`");
        let msg = error.to_string();
        assert!(msg.contains("missing field `version`"), "in: {msg}");
    }

    #[test]
    fn test_not_found_display_and_predicate() {
        let error = ProviderError::not_found("1.20.1", "forge", "47.9.99");
        assert!(error.is_not_found());
        let msg = error.to_string();
        assert!(msg.contains("1.20.1"), "expected version in: {msg}");
        assert!(msg.contains("forge"), "expected flavor in: {msg}");
        assert!(msg.contains("47.9.99"), "expected build in: {msg}");
    }

    #[test]
    fn test_non_miss_variants_are_not_not_found() {
        assert!(!ProviderError::status("u", 500).is_not_found());
        assert!(!ProviderError::schema("u", "d").is_not_found());
    }
}
