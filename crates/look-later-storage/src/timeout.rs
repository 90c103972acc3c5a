use async_trait::async_trait;
use look_later_core::{
    LinkCollection, LinkKey, LinkRecord, LinkStore, ReadLinkStore, Result, StorageUsage,
    StoreError,
};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// A Link Store decorator that bounds every call with a deadline.
///
/// A call that does not finish in time is dropped (cancelling it) and
/// reported as [`StoreError::Timeout`].
#[derive(Debug, Clone)]
pub struct TimeoutLinkStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S> TimeoutLinkStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.timeout.as_millis();
                warn!(operation, timeout_ms, "store operation timed out");
                Err(StoreError::Timeout(format!(
                    "{operation} did not finish within {timeout_ms}ms"
                )))
            }
        }
    }
}

#[async_trait]
impl<S: ReadLinkStore> ReadLinkStore for TimeoutLinkStore<S> {
    async fn get_all(&self) -> Result<LinkCollection> {
        self.bounded("get_all", self.inner.get_all()).await
    }

    async fn usage(&self) -> Result<StorageUsage> {
        self.bounded("usage", self.inner.usage()).await
    }
}

#[async_trait]
impl<S: LinkStore> LinkStore for TimeoutLinkStore<S> {
    async fn upsert(&self, record: LinkRecord) -> Result<()> {
        self.bounded("upsert", self.inner.upsert(record)).await
    }

    async fn delete(&self, key: &LinkKey) -> Result<bool> {
        self.bounded("delete", self.inner.delete(key)).await
    }
}
