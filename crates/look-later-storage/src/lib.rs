//! Storage backends for Look Later.
//!
//! A [`Substrate`] is the host key-value engine (`chrome.storage.local` in the
//! browser, Redis or memory here). [`KvLinkStore`] implements the Link Store
//! contract on top of any substrate, and [`TimeoutLinkStore`] bounds every
//! call with a deadline.

pub mod link_store;
pub mod memory;
pub mod prefs;
pub mod redis;
pub mod substrate;
pub mod timeout;

pub use link_store::{KvLinkStore, StoreSettings, LINKS_KEY};
pub use look_later_core::{LinkStore, ReadLinkStore, Result, StoreError};
pub use memory::InMemorySubstrate;
pub use prefs::{PrefsStore, PREFS_KEY};
pub use redis::RedisSubstrate;
pub use substrate::{CasOutcome, Substrate, Versioned, DEFAULT_QUOTA_BYTES};
pub use timeout::TimeoutLinkStore;
