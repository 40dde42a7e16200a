//! Local identity resolution.
//!
//! Wallet mechanics live outside the crate behind [`IdentityProvider`].  The
//! resolver remembers the first identity it gets and keeps asking the
//! provider only while it has none.

use crate::error::SyncError;
use crate::types::EntityIdentity;
use log::error;

pub trait IdentityProvider: Send + Sync {
    fn active_identity(&self) -> Option<EntityIdentity>;
}

/// Provider with a fixed answer, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<EntityIdentity>);

impl StaticIdentity {
    pub fn new(identity: Option<EntityIdentity>) -> Self {
        Self(identity)
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn active_identity(&self) -> Option<EntityIdentity> {
        self.0.clone()
    }
}

impl<F> IdentityProvider for F
where
    F: Fn() -> Option<EntityIdentity> + Send + Sync,
{
    fn active_identity(&self) -> Option<EntityIdentity> {
        self()
    }
}

pub struct IdentityResolver {
    provider: Box<dyn IdentityProvider>,
    cached: Option<EntityIdentity>,
    failed_attempts: u64,
}

impl IdentityResolver {
    pub fn new(provider: impl IdentityProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            cached: None,
            failed_attempts: 0,
        }
    }

    /// Resolve the local identity, logging each failed attempt.
    pub fn resolve(&mut self) -> Option<&EntityIdentity> {
        if self.cached.is_none() {
            self.cached = self
                .provider
                .active_identity()
                .filter(|id| !id.as_str().trim().is_empty());
        }

        if self.cached.is_none() {
            self.failed_attempts += 1;
            error!(
                "{} – treating every sender as remote",
                SyncError::MissingIdentity
            );
        }

        self.cached.as_ref()
    }

    pub fn current(&self) -> Option<&EntityIdentity> {
        self.cached.as_ref()
    }

    pub fn failed_attempts(&self) -> u64 {
        self.failed_attempts
    }
}
