use crate::substrate::{entry_size, CasOutcome, Substrate, Versioned, DEFAULT_QUOTA_BYTES};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use look_later_core::{Result, StoreError};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{trace, warn};

/// In-memory storage entry. The JSON text is kept to charge byte usage.
#[derive(Debug, Clone)]
struct Entry {
    json: String,
    version: u64,
}

impl Entry {
    fn decode(&self, key: &str) -> Result<Versioned<Value>> {
        let value = serde_json::from_str(&self.json).map_err(|e| {
            StoreError::InvalidData(format!("invalid value stored under '{key}': {e}"))
        })?;
        Ok(Versioned {
            value,
            version: self.version,
        })
    }
}

/// In-memory implementation of [`Substrate`] using DashMap.
///
/// Reads go straight to the map. Writes are serialized so the quota check
/// and the write see the same namespace.
#[derive(Debug)]
pub struct InMemorySubstrate {
    storage: DashMap<String, Entry>,
    write_lock: Mutex<()>,
    quota_bytes: u64,
}

impl InMemorySubstrate {
    /// Creates an empty substrate with the browser's default quota.
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    /// Creates an empty substrate with a custom quota.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            storage: DashMap::new(),
            write_lock: Mutex::new(()),
            quota_bytes,
        }
    }

    fn encode(key: &str, value: &Value) -> Result<String> {
        serde_json::to_string(value).map_err(|e| {
            StoreError::Write(format!("failed to serialize value for '{key}': {e}"))
        })
    }

    /// Rejects a write that would push the namespace past its quota.
    /// Callers hold `write_lock`.
    fn check_quota(&self, key: &str, json: &str) -> Result<()> {
        let others: u64 = self
            .storage
            .iter()
            .filter(|entry| entry.key() != key)
            .map(|entry| entry_size(entry.key(), &entry.value().json))
            .sum();
        let required = others + entry_size(key, json);
        if required > self.quota_bytes {
            warn!(key, required, quota = self.quota_bytes, "write exceeds storage quota");
            return Err(StoreError::Write(format!(
                "quota exceeded: {required} of {} bytes",
                self.quota_bytes
            )));
        }
        Ok(())
    }
}

impl Default for InMemorySubstrate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Substrate for InMemorySubstrate {
    async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>> {
        trace!(key, "reading from memory substrate");
        let Some(entry) = self.storage.get(key) else {
            return Ok(None);
        };
        entry.decode(key).map(Some)
    }

    async fn set(&self, key: &str, value: Value) -> Result<u64> {
        let json = Self::encode(key, &value)?;
        let _write = self.write_lock.lock();
        self.check_quota(key, &json)?;

        let mut entry = self.storage.entry(key.to_owned()).or_insert(Entry {
            json: String::new(),
            version: 0,
        });
        entry.json = json;
        entry.version += 1;
        Ok(entry.version)
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome> {
        let json = Self::encode(key, &value)?;
        let _write = self.write_lock.lock();
        // Checked before taking the entry guard; iterating the map while
        // holding a shard write guard would deadlock.
        self.check_quota(key, &json)?;

        match (self.storage.entry(key.to_owned()), expected) {
            (MapEntry::Vacant(vacant), None) => {
                vacant.insert(Entry { json, version: 1 });
                Ok(CasOutcome::Applied { version: 1 })
            }
            (MapEntry::Occupied(mut occupied), Some(expected))
                if occupied.get().version == expected =>
            {
                let entry = occupied.get_mut();
                entry.json = json;
                entry.version += 1;
                Ok(CasOutcome::Applied {
                    version: entry.version,
                })
            }
            _ => {
                trace!(key, ?expected, "stale compare-and-set");
                Ok(CasOutcome::Stale)
            }
        }
    }

    async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64> {
        let total = match keys {
            Some(keys) => keys
                .iter()
                .filter_map(|key| {
                    self.storage
                        .get(*key)
                        .map(|entry| entry_size(key, &entry.json))
                })
                .sum(),
            None => self
                .storage
                .iter()
                .map(|entry| entry_size(entry.key(), &entry.value().json))
                .sum(),
        };
        Ok(total)
    }

    fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn get_missing_key() {
        let substrate = InMemorySubstrate::new();

        assert!(substrate.get("links").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_bumps_version() {
        let substrate = InMemorySubstrate::new();

        assert_eq!(substrate.set("prefs", json!({"size": 1})).await.unwrap(), 1);
        assert_eq!(substrate.set("prefs", json!({"size": 2})).await.unwrap(), 2);

        let stored = substrate.get("prefs").await.unwrap().unwrap();
        assert_eq!(stored.value, json!({"size": 2}));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn compare_and_set_on_fresh_key() {
        let substrate = InMemorySubstrate::new();

        let outcome = substrate
            .compare_and_set("links", None, json!({}))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Applied { version: 1 });

        // A second "never written" expectation is now stale.
        let outcome = substrate
            .compare_and_set("links", None, json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(outcome, CasOutcome::Stale);
        assert_eq!(substrate.get("links").await.unwrap().unwrap().value, json!({}));
    }

    #[tokio::test]
    async fn compare_and_set_rejects_old_version() {
        let substrate = InMemorySubstrate::new();
        substrate.set("links", json!({"v": 1})).await.unwrap();
        substrate.set("links", json!({"v": 2})).await.unwrap();

        let stale = substrate
            .compare_and_set("links", Some(1), json!({"v": 3}))
            .await
            .unwrap();
        let applied = substrate
            .compare_and_set("links", Some(2), json!({"v": 3}))
            .await
            .unwrap();

        assert_eq!(stale, CasOutcome::Stale);
        assert_eq!(applied, CasOutcome::Applied { version: 3 });
    }

    #[tokio::test]
    async fn bytes_in_use_counts_key_and_json() {
        let substrate = InMemorySubstrate::new();
        substrate.set("links", json!({})).await.unwrap();
        substrate.set("prefs", json!({"size": 75})).await.unwrap();

        // "links" + "{}" and "prefs" + "{\"size\":75}"
        assert_eq!(substrate.bytes_in_use(Some(&["links"])).await.unwrap(), 7);
        assert_eq!(substrate.bytes_in_use(None).await.unwrap(), 7 + 16);
        assert_eq!(substrate.bytes_in_use(Some(&["missing"])).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn write_over_quota_fails() {
        let substrate = InMemorySubstrate::with_quota(16);

        substrate.set("k", json!("short")).await.unwrap();
        let err = substrate
            .set("k", json!("this value is far too long"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(substrate.get("k").await.unwrap().unwrap().value, json!("short"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn quota_holds_under_concurrent_writers() {
        // Room for one 16-byte entry, not two.
        let substrate = Arc::new(InMemorySubstrate::with_quota(20));

        for round in 0..50 {
            let writes: Vec<_> = ["a", "b"]
                .into_iter()
                .map(|key| {
                    let substrate = Arc::clone(&substrate);
                    let key = format!("{key}{round}");
                    tokio::spawn(async move {
                        substrate.set(&key, json!("123456789012")).await
                    })
                })
                .collect();
            for write in writes {
                let _ = write.await.unwrap();
            }

            assert!(substrate.bytes_in_use(None).await.unwrap() <= 20);
        }
    }
}
