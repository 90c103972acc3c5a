//! Popup list logic for Look Later.
//!
//! [`ListPresenter`] reads the stored links, orders them by the selected
//! [`SortMode`], derives the display strings, and routes removals through the
//! coordinator. Drawing the result is left to the surface that owns it.

pub mod display;
pub mod error;
pub mod presenter;
pub mod sort;

pub use display::{abbreviate_uri, format_timestamp, scale_size, usage_report, DisplaySettings};
pub use error::{PresenterError, Result};
pub use presenter::{
    LinkRemover, LinkRow, ListPresenter, ListView, Navigator, PopupView, UsageView,
};
pub use sort::{sort_links, SortMode};
