//! Credential publishing.
//!
//! The rotator hands each new credential to a [`CredentialPublisher`], which
//! stores it where the registration endpoint reads it. Publishing replaces the
//! previous value wholesale: readers see the old credential or the new one,
//! never a mix of both.
//!
//! [`MemoryPublisher`] is the in-process backend. Durable backends (secret
//! stores and the like) implement the same trait.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::BootstrapCredential;

/// Destination for freshly minted bootstrap credentials.
#[async_trait]
pub trait CredentialPublisher: Send + Sync {
    /// Store `credential` as the current value, replacing any previous one.
    ///
    /// The new value must become visible to all later reads at once.
    /// Retries, if any, belong here; the rotator treats an error as fatal.
    async fn publish(&self, credential: &BootstrapCredential) -> crate::Result<()>;
}

/// In-memory publisher with atomic replace-on-publish.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    current: RwLock<Option<Arc<BootstrapCredential>>>,
    publishes: AtomicU64,
}

impl MemoryPublisher {
    /// Create an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published credential, if any.
    pub fn current(&self) -> Option<Arc<BootstrapCredential>> {
        self.current.read().clone()
    }

    /// Number of successful publishes so far.
    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CredentialPublisher for MemoryPublisher {
    async fn publish(&self, credential: &BootstrapCredential) -> crate::Result<()> {
        let next = Arc::new(credential.clone());
        *self.current.write() = Some(next);
        self.publishes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
