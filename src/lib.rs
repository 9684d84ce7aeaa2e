//! Coreget Core Library
//!
//! Resolves and retrieves distributable game-server artifacts for a target
//! runtime version from multiple independent, inconsistent upstream
//! metadata providers, and presents one coherent, orderable, retry-safe
//! abstraction over all of them.
//!
//! # Architecture
//!
//! - [`version_key`] - version/build string parsing and total ordering
//! - [`provider`] - per-upstream adapters behind the `ServerProvider` trait
//! - [`engine`] - provider selection/aggregation and the resolution pipeline
//! - [`transfer`] - streamed download with atomic temp-file-then-rename publish
//! - [`events`] - the log/progress/done notification surface
//! - [`identity`] - injected per-installation identity collaborator

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod events;
pub mod identity;
pub mod provider;
pub mod transfer;
pub mod version_key;

// Re-export commonly used types
pub use engine::{EngineError, ResolutionEngine};
pub use events::{Event, EventBus};
pub use identity::{FixedIdentity, IdentityProvider};
pub use provider::{
    ArtifactLocation, BmclapiProvider, Build, Channel, Digest, Flavor, MetaClient, MojangProvider,
    ProviderError, ProviderRegistry, RuntimeVersion, ServerProvider, UnknownFlavor,
    build_default_provider_registry,
};
pub use transfer::{TransferError, TransferExecutor};
pub use version_key::VersionKey;
