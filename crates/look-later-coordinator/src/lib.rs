//! Background coordinator for Look Later.
//!
//! The [`Coordinator`] is the only writer to the Link Store. It holds the
//! pending capture between the page's right-click and the user's menu
//! confirmation, keeps the icon badge in step with the stored link count, and
//! answers remove requests from popups over a request/response channel.

pub mod badge;
pub mod channel;
pub mod coordinator;
pub mod error;
pub mod host;
pub mod message;
pub mod pending;
pub mod relay;
pub mod wire;

pub use badge::{BadgeSurface, SharedBadge};
pub use channel::{
    notification_channel, request_channel, NotificationReceiver, NotificationSender,
    RemoveClient, RequestEnvelope, RequestReceiver,
};
pub use coordinator::{Coordinator, CoordinatorSettings, Endpoints, MENU_ITEM_ID};
pub use error::{CoordinatorError, Result};
pub use message::{Notification, RemoveResponse, Request};
pub use pending::PendingCapture;
pub use host::run_session;
pub use relay::{find_enclosing_anchor, CaptureRelay, DomNode, PageLocation};
pub use wire::{WireError, WireResult};
