use async_trait::async_trait;
use look_later_core::Result;
use serde_json::Value;

/// Quota of the browser's local extension storage area, in bytes.
pub const DEFAULT_QUOTA_BYTES: u64 = 5_242_880;

/// A stored value together with the version stamp it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Result of a [`Substrate::compare_and_set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write happened; the key now carries `version`.
    Applied { version: u64 },
    /// Another writer got there first. Nothing was written.
    Stale,
}

/// The host key-value storage engine.
///
/// Values are JSON documents. Every successful write bumps the key's version
/// stamp, which lets callers build optimistic read-modify-write cycles on top
/// of [`compare_and_set`](Substrate::compare_and_set).
#[async_trait]
pub trait Substrate: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` if it was never written.
    async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>>;

    /// Unconditionally writes `value`, returning the new version.
    async fn set(&self, key: &str, value: Value) -> Result<u64>;

    /// Writes `value` only if the key is still at `expected`
    /// (`None` meaning "never written").
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<u64>,
        value: Value,
    ) -> Result<CasOutcome>;

    /// Bytes used by the given keys, or by the whole namespace for `None`.
    async fn bytes_in_use(&self, keys: Option<&[&str]>) -> Result<u64>;

    /// The fixed byte ceiling of the namespace.
    fn quota_bytes(&self) -> u64;
}

/// Bytes charged for one entry: the key plus its JSON serialization.
pub(crate) fn entry_size(key: &str, json: &str) -> u64 {
    (key.len() + json.len()) as u64
}
