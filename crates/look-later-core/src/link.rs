use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

/// One saved link.
///
/// The capture timestamp doubles as the record's unique key; records are
/// never modified after they are stored, only deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Milliseconds since the Unix epoch, assigned at capture time.
    pub timestamp: i64,
    /// Absolute URI of the captured link.
    pub href: String,
    /// Visible text of the clicked element. May be empty.
    pub text: String,
    /// `host + path` of the page the link was captured from.
    pub origin: String,
}

impl LinkRecord {
    pub fn new(
        timestamp: i64,
        href: impl Into<String>,
        text: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            href: href.into(),
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// Returns the key this record is stored under.
    pub fn key(&self) -> LinkKey {
        LinkKey::from(self.timestamp)
    }
}

/// Storage key of a [`LinkRecord`]: the decimal string form of its timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkKey(String);

impl LinkKey {
    /// Wraps a key received from a client without checking that it parses
    /// as a timestamp. Keys that match nothing are simply absent.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for LinkKey {
    fn from(timestamp: i64) -> Self {
        Self(timestamp.to_string())
    }
}

impl Display for LinkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Every stored link, keyed by [`LinkKey`].
///
/// Serializes as a plain JSON object `{"<timestamp>": LinkRecord, ...}`.
/// Iteration order carries no meaning; consumers sort on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkCollection {
    links: BTreeMap<String, LinkRecord>,
}

impl LinkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn get(&self, key: &LinkKey) -> Option<&LinkRecord> {
        self.links.get(key.as_str())
    }

    pub fn contains(&self, key: &LinkKey) -> bool {
        self.links.contains_key(key.as_str())
    }

    /// Inserts the record under its own key, replacing any previous entry.
    pub fn upsert(&mut self, record: LinkRecord) -> Option<LinkRecord> {
        self.links.insert(record.key().0, record)
    }

    /// Removes the entry for `key`. Returns the removed record, if any.
    pub fn remove(&mut self, key: &LinkKey) -> Option<LinkRecord> {
        self.links.remove(key.as_str())
    }

    pub fn records(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links.values()
    }

    pub fn into_records(self) -> Vec<LinkRecord> {
        self.links.into_values().collect()
    }
}

impl FromIterator<LinkRecord> for LinkCollection {
    fn from_iter<T: IntoIterator<Item = LinkRecord>>(iter: T) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.upsert(record);
        }
        collection
    }
}
