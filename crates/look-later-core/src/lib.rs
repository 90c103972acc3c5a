//! Core types and traits for Look Later.
//!
//! This crate provides the link data model and the Link Store contract shared
//! by the background coordinator and the popup presenter.

pub mod badge;
pub mod clock;
pub mod error;
pub mod link;
pub mod prefs;
pub mod stamp;
pub mod store;

pub use badge::badge_text;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, StoreError};
pub use link::{LinkCollection, LinkKey, LinkRecord};
pub use prefs::Preferences;
pub use stamp::MonotonicStamper;
pub use store::{LinkStore, ReadLinkStore, StorageUsage};
