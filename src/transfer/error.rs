//! Error types for artifact transfers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that terminate a transfer.
///
/// Every variant guarantees the final destination name was not produced.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The resolved artifact URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The pre-check found no artifact at the URL (missing or not yet
    /// synced to the mirror).
    #[error("artifact not found or not yet synced at {url} (HTTP {status})")]
    NotSynced {
        /// The artifact URL.
        url: String,
        /// The status the pre-check returned.
        status: u16,
    },

    /// Network-level failure during pre-check or streaming.
    #[error("network error transferring {url}: {source}")]
    Network {
        /// The artifact URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error (create, write, rename).
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A transfer to the same destination path is already in flight.
    #[error("a transfer to {path} is already in flight")]
    DestinationBusy {
        /// The contested destination path.
        path: PathBuf,
    },

    /// The caller cancelled the transfer mid-stream.
    #[error("transfer of {url} cancelled")]
    Cancelled {
        /// The artifact URL.
        url: String,
    },
}

impl TransferError {
    /// Creates an invalid-URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a pre-check miss error.
    pub fn not_synced(url: impl Into<String>, status: u16) -> Self {
        Self::NotSynced {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a destination-contention error.
    pub fn destination_busy(path: impl Into<PathBuf>) -> Self {
        Self::DestinationBusy { path: path.into() }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }
}
