use crate::error::Result;
use crate::link::{LinkCollection, LinkKey, LinkRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Byte consumption of the storage namespace against its quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub bytes_in_use: u64,
    pub quota_bytes: u64,
}

impl StorageUsage {
    pub fn new(bytes_in_use: u64, quota_bytes: u64) -> Self {
        Self {
            bytes_in_use,
            quota_bytes,
        }
    }

    /// Percentage of the quota in use. A zero quota reports 0.
    pub fn percent_used(&self) -> f64 {
        if self.quota_bytes == 0 {
            return 0.0;
        }
        100.0 * self.bytes_in_use as f64 / self.quota_bytes as f64
    }
}

/// A read-only view of the Link Store.
///
/// The popup reads through this trait directly; reads need no mediation.
#[async_trait]
pub trait ReadLinkStore: Send + Sync + 'static {
    /// Returns every stored link.
    /// Returns an empty collection if nothing was ever written.
    async fn get_all(&self) -> Result<LinkCollection>;

    /// Reports current byte consumption and the quota ceiling.
    async fn usage(&self) -> Result<StorageUsage>;
}

/// Durable storage of links. Only the coordinator writes through this trait.
#[async_trait]
pub trait LinkStore: ReadLinkStore {
    /// Writes the record under its own key, replacing any previous entry.
    async fn upsert(&self, record: LinkRecord) -> Result<()>;

    /// Removes the entry for `key`.
    ///
    /// Returns `Err(NotFound)` if no collection was ever written, and
    /// `Ok(false)` if the collection exists but lacks the key.
    async fn delete(&self, key: &LinkKey) -> Result<bool>;
}

#[async_trait]
impl<S: ReadLinkStore + ?Sized> ReadLinkStore for Arc<S> {
    async fn get_all(&self) -> Result<LinkCollection> {
        (**self).get_all().await
    }

    async fn usage(&self) -> Result<StorageUsage> {
        (**self).usage().await
    }
}

#[async_trait]
impl<S: LinkStore + ?Sized> LinkStore for Arc<S> {
    async fn upsert(&self, record: LinkRecord) -> Result<()> {
        (**self).upsert(record).await
    }

    async fn delete(&self, key: &LinkKey) -> Result<bool> {
        (**self).delete(key).await
    }
}
