//! Injected per-installation identity.
//!
//! Upstream mirrors accept a static identity header per request. Where the
//! id comes from (and whether it persists) is the host application's
//! business; the engine only needs a collaborator it can ask, so tests can
//! supply a fixed id without touching disk.

/// Supplies the per-installation id attached to metadata requests.
pub trait IdentityProvider: Send + Sync {
    /// A stable, opaque installation identifier.
    fn installation_id(&self) -> String;
}

/// An identity provider backed by a fixed string.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    id: String,
}

impl FixedIdentity {
    /// Creates a fixed identity from the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl IdentityProvider for FixedIdentity {
    fn installation_id(&self) -> String {
        self.id.clone()
    }
}
