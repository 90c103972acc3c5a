use crate::substrate::{CasOutcome, Substrate, Versioned};
use async_trait::async_trait;
use look_later_core::{
    LinkCollection, LinkKey, LinkRecord, LinkStore, ReadLinkStore, Result, StorageUsage,
    StoreError,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

/// Substrate key holding the whole link collection.
pub const LINKS_KEY: &str = "links";

const DEFAULT_MAX_CAS_ATTEMPTS: u32 = 8;

/// Configures a [`KvLinkStore`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct StoreSettings {
    /// How many read-modify-write cycles a single upsert or delete may run
    /// before giving up with [`StoreError::Conflict`].
    #[builder(default = DEFAULT_MAX_CAS_ATTEMPTS)]
    pub max_cas_attempts: u32,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What a modification decided to do with the collection it was shown.
enum Step<T> {
    Write(LinkCollection, T),
    Skip(T),
}

/// Link Store over a key-value [`Substrate`].
///
/// The whole collection lives under [`LINKS_KEY`]. Mutations read the
/// collection, change it, and write it back with a compare-and-set on the
/// version they read, so two interleaved writers cannot silently drop each
/// other's update; the loser re-reads and tries again.
#[derive(Debug)]
pub struct KvLinkStore<S> {
    substrate: Arc<S>,
    settings: StoreSettings,
}

impl<S> Clone for KvLinkStore<S> {
    fn clone(&self) -> Self {
        Self {
            substrate: Arc::clone(&self.substrate),
            settings: self.settings,
        }
    }
}

impl<S: Substrate> KvLinkStore<S> {
    pub fn new(substrate: S) -> Self {
        Self::with_settings(substrate, StoreSettings::default())
    }

    pub fn with_settings(substrate: S, settings: StoreSettings) -> Self {
        Self::from_shared(Arc::new(substrate), settings)
    }

    /// Builds a store over a substrate that is also used elsewhere
    /// (e.g. by a [`PrefsStore`](crate::PrefsStore)).
    pub fn from_shared(substrate: Arc<S>, settings: StoreSettings) -> Self {
        Self {
            substrate,
            settings,
        }
    }

    pub fn substrate(&self) -> &Arc<S> {
        &self.substrate
    }

    async fn read_links(&self) -> Result<Option<Versioned<LinkCollection>>> {
        let Some(stored) = self.substrate.get(LINKS_KEY).await? else {
            return Ok(None);
        };

        let links = serde_json::from_value::<LinkCollection>(stored.value).map_err(|e| {
            warn!(error = %e, "stored link collection is malformed");
            StoreError::InvalidData(format!("invalid link collection: {e}"))
        })?;

        Ok(Some(Versioned {
            value: links,
            version: stored.version,
        }))
    }

    /// Runs one optimistic read-modify-write on the collection.
    async fn modify<T, F>(&self, operation: &'static str, mut step: F) -> Result<T>
    where
        F: FnMut(Option<LinkCollection>) -> Result<Step<T>> + Send,
        T: Send,
    {
        for attempt in 1..=self.settings.max_cas_attempts {
            let current = self.read_links().await?;
            let (expected, links) = match current {
                Some(Versioned { value, version }) => (Some(version), Some(value)),
                None => (None, None),
            };

            let (links, output) = match step(links)? {
                Step::Skip(output) => return Ok(output),
                Step::Write(links, output) => (links, output),
            };

            let count = links.len();
            let value = serde_json::to_value(&links).map_err(|e| {
                StoreError::Write(format!("failed to serialize link collection: {e}"))
            })?;

            match self
                .substrate
                .compare_and_set(LINKS_KEY, expected, value)
                .await?
            {
                CasOutcome::Applied { version } => {
                    debug!(operation, version, count, "link collection written");
                    return Ok(output);
                }
                CasOutcome::Stale => {
                    trace!(operation, attempt, "link collection changed underneath, retrying");
                }
            }
        }

        warn!(
            operation,
            attempts = self.settings.max_cas_attempts,
            "gave up after repeated concurrent updates"
        );
        Err(StoreError::Conflict(format!(
            "{operation} lost {} consecutive races",
            self.settings.max_cas_attempts
        )))
    }
}

#[async_trait]
impl<S: Substrate> ReadLinkStore for KvLinkStore<S> {
    async fn get_all(&self) -> Result<LinkCollection> {
        trace!("reading all links");
        Ok(self
            .read_links()
            .await?
            .map(|stored| stored.value)
            .unwrap_or_default())
    }

    async fn usage(&self) -> Result<StorageUsage> {
        let bytes_in_use = self.substrate.bytes_in_use(None).await?;
        Ok(StorageUsage::new(bytes_in_use, self.substrate.quota_bytes()))
    }
}

#[async_trait]
impl<S: Substrate> LinkStore for KvLinkStore<S> {
    async fn upsert(&self, record: LinkRecord) -> Result<()> {
        debug!(key = %record.key(), href = %record.href, "storing link");
        self.modify("upsert", |links| {
            let mut links = links.unwrap_or_default();
            links.upsert(record.clone());
            Ok(Step::Write(links, ()))
        })
        .await
    }

    async fn delete(&self, key: &LinkKey) -> Result<bool> {
        debug!(key = %key, "removing link");
        self.modify("delete", |links| match links {
            None => {
                warn!(key = %key, "no stored links to remove from");
                Err(StoreError::NotFound(format!(
                    "can't find any stored items to remove (key {key})"
                )))
            }
            Some(mut links) => {
                if links.remove(key).is_some() {
                    Ok(Step::Write(links, true))
                } else {
                    trace!(key = %key, "key not present, nothing to write");
                    Ok(Step::Skip(false))
                }
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySubstrate;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record(timestamp: i64, text: &str) -> LinkRecord {
        LinkRecord::new(
            timestamp,
            format!("https://example.com/{timestamp}"),
            text,
            "example.org/page",
        )
    }

    fn store() -> KvLinkStore<InMemorySubstrate> {
        KvLinkStore::new(InMemorySubstrate::new())
    }

    #[tokio::test]
    async fn get_all_on_fresh_store_is_empty() {
        let links = store().get_all().await.unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_get_all_round_trips() {
        let store = store();
        let saved = record(1594570000123, "Rust book");

        store.upsert(saved.clone()).await.unwrap();

        let links = store.get_all().await.unwrap();
        assert_eq!(links.get(&LinkKey::new("1594570000123")), Some(&saved));
    }

    #[tokio::test]
    async fn upsert_writes_persisted_layout() {
        let store = store();
        store.upsert(record(7, "seven")).await.unwrap();

        let raw = store.substrate().get(LINKS_KEY).await.unwrap().unwrap();
        assert_eq!(
            raw.value,
            json!({"7": {"timestamp": 7, "href": "https://example.com/7", "text": "seven", "origin": "example.org/page"}})
        );
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let store = store();
        for ts in [100, 200, 300] {
            store.upsert(record(ts, "x")).await.unwrap();
        }

        assert!(store.delete(&LinkKey::from(200)).await.unwrap());

        let links = store.get_all().await.unwrap();
        assert_eq!(links.len(), 2);
        assert!(!links.contains(&LinkKey::from(200)));
        assert_eq!(links.get(&LinkKey::from(100)), Some(&record(100, "x")));
        assert_eq!(links.get(&LinkKey::from(300)), Some(&record(300, "x")));
    }

    #[tokio::test]
    async fn delete_without_collection_is_not_found() {
        let err = store().delete(&LinkKey::from(1)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_absent_key_leaves_collection_untouched() {
        let store = store();
        store.upsert(record(1, "one")).await.unwrap();
        let before = store.substrate().get(LINKS_KEY).await.unwrap().unwrap();

        assert!(!store.delete(&LinkKey::from(2)).await.unwrap());

        let after = store.substrate().get(LINKS_KEY).await.unwrap().unwrap();
        assert_eq!(before.version, after.version);
    }

    #[tokio::test]
    async fn malformed_collection_is_invalid_data() {
        let store = store();
        store
            .substrate()
            .set(LINKS_KEY, json!(["not", "a", "map"]))
            .await
            .unwrap();

        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[tokio::test]
    async fn usage_reports_bytes_and_quota() {
        let store = KvLinkStore::new(InMemorySubstrate::with_quota(10_000));
        store.upsert(record(1, "one")).await.unwrap();

        let usage = store.usage().await.unwrap();
        let json = serde_json::to_string(&store.get_all().await.unwrap()).unwrap();
        assert_eq!(usage.bytes_in_use, (LINKS_KEY.len() + json.len()) as u64);
        assert_eq!(usage.quota_bytes, 10_000);
    }

    #[tokio::test]
    async fn concurrent_writers_lose_nothing() {
        let store = Arc::new(store());
        store.upsert(record(0, "seed")).await.unwrap();

        let mut handles = vec![];
        for ts in 1..=20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.upsert(record(ts, "concurrent")).await.unwrap();
            }));
        }
        let remover = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            remover.delete(&LinkKey::from(0)).await.unwrap();
        }));

        for handle in handles {
            handle.await.unwrap();
        }

        let links = store.get_all().await.unwrap();
        assert_eq!(links.len(), 20);
        assert!(!links.contains(&LinkKey::from(0)));
    }

    /// A substrate whose compare-and-set always loses the race.
    struct AlwaysStale {
        inner: InMemorySubstrate,
        attempts: AtomicU32,
    }

    #[async_trait]
    impl Substrate for AlwaysStale {
        async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Value) -> Result<u64> {
            self.inner.set(key, value).await
        }

        async fn compare_and_set(
            &self,
            _key: &str,
            _expected: Option<u64>,
            _value: Value,
        ) -> Result<CasOutcome> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(CasOutcome::Stale)
        }

        async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64> {
            self.inner.bytes_in_use(keys).await
        }

        fn quota_bytes(&self) -> u64 {
            self.inner.quota_bytes()
        }
    }

    #[tokio::test]
    async fn exhausted_retries_report_conflict() {
        let substrate = AlwaysStale {
            inner: InMemorySubstrate::new(),
            attempts: AtomicU32::new(0),
        };
        let settings = StoreSettings::builder().max_cas_attempts(3).build();
        let store = KvLinkStore::with_settings(substrate, settings);

        let err = store.upsert(record(1, "one")).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.substrate().attempts.load(Ordering::SeqCst), 3);
    }
}
