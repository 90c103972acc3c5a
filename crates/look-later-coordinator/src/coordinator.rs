use crate::badge::BadgeSurface;
use crate::channel::{
    notification_channel, request_channel, NotificationReceiver, NotificationSender, RemoveClient,
    RequestEnvelope, RequestReceiver,
};
use crate::message::{Notification, RemoveResponse, Request};
use crate::pending::PendingCapture;
use look_later_core::{badge_text, LinkKey, LinkRecord, LinkStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

/// Id of the "Store to Look Later" context-menu item.
pub const MENU_ITEM_ID: &str = "ll_add";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_REQUEST_CAPACITY: usize = 32;

/// Configures a [`Coordinator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct CoordinatorSettings {
    /// Bound on a popup's remove round-trip.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    pub request_timeout: Duration,
    /// Queue depth of the remove request channel.
    #[builder(default = DEFAULT_REQUEST_CAPACITY)]
    pub request_capacity: usize,
    /// The menu item whose activation confirms a pending capture.
    #[builder(default = MENU_ITEM_ID.to_string(), setter(into))]
    pub menu_item_id: String,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Handles through which capture relays, menus and popups reach a running
/// coordinator.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub notifications: NotificationSender,
    pub requests: RemoveClient,
}

/// The single writer to the Link Store.
///
/// Owns the pending capture and the badge count for the life of the process.
/// All state lives in this value and is touched only from the task that runs
/// [`serve`](Coordinator::serve), so no locking is involved.
pub struct Coordinator<S, B> {
    store: Arc<S>,
    badge: B,
    settings: CoordinatorSettings,
    pending: PendingCapture,
    badge_count: i64,
}

impl<S: LinkStore, B: BadgeSurface> Coordinator<S, B> {
    pub fn new(store: S, badge: B, settings: CoordinatorSettings) -> Self {
        Self::from_shared(Arc::new(store), badge, settings)
    }

    /// Builds a coordinator over a store that popups also read from.
    pub fn from_shared(store: Arc<S>, badge: B, settings: CoordinatorSettings) -> Self {
        Self {
            store,
            badge,
            settings,
            pending: PendingCapture::Empty,
            badge_count: 0,
        }
    }

    pub fn pending(&self) -> &PendingCapture {
        &self.pending
    }

    pub fn badge_count(&self) -> i64 {
        self.badge_count
    }

    /// Brings the badge in line with whatever is already stored.
    pub async fn start(&mut self) {
        info!("coordinator starting");
        self.refresh_badge().await;
    }

    /// Records a right-clicked link as the pending capture.
    pub fn report_capture(&mut self, record: LinkRecord) {
        debug!(key = %record.key(), href = %record.href, "capture armed");
        if let Some(replaced) = self.pending.arm(record) {
            trace!(key = %replaced.key(), "previous capture replaced before confirmation");
        }
    }

    /// Stores the pending capture, if there is one.
    ///
    /// Failures are logged only. A capture whose write failed stays armed so
    /// the next confirmation retries it.
    pub async fn confirm_save(&mut self) {
        let Some(record) = self.pending.take() else {
            debug!("save confirmed with nothing pending");
            return;
        };

        let key = record.key();
        match self.store.upsert(record.clone()).await {
            Ok(()) => {
                info!(key = %key, "link stored");
                self.refresh_badge().await;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "failed to store link, keeping it pending");
                self.pending = PendingCapture::Armed(record);
            }
        }
    }

    /// Confirms the pending capture when the menu item is ours.
    pub async fn on_menu_click(&mut self, menu_item_id: &str) {
        if menu_item_id == self.settings.menu_item_id {
            self.confirm_save().await;
        } else {
            trace!(menu_item_id, "ignoring foreign menu item");
        }
    }

    /// Deletes `key` and refreshes the badge. Never fails outright.
    pub async fn remove_link(&mut self, key: &LinkKey) -> RemoveResponse {
        let response = self.delete_link(key).await;
        if response.success {
            self.refresh_badge().await;
        }
        response
    }

    async fn delete_link(&mut self, key: &LinkKey) -> RemoveResponse {
        match self.store.delete(key).await {
            Ok(removed) => {
                debug!(key = %key, removed, "remove request handled");
                RemoveResponse { success: true }
            }
            Err(e) => {
                warn!(key = %key, error = %e, "remove request failed");
                RemoveResponse { success: false }
            }
        }
    }

    pub async fn handle_notification(&mut self, notification: Notification) {
        match notification {
            Notification::Link(record) => self.report_capture(record),
            Notification::MenuClick(menu_item_id) => self.on_menu_click(&menu_item_id).await,
        }
    }

    /// Answers a request as soon as the store has, then recounts the badge.
    pub async fn handle_request(&mut self, envelope: RequestEnvelope) {
        let response = match &envelope.request {
            Request::Remove(key) => self.delete_link(key).await,
        };
        if envelope.reply.send(response).is_err() {
            debug!("requester went away before the reply");
        }
        if response.success {
            self.refresh_badge().await;
        }
    }

    /// Runs the event loop until `cancel` fires or every sender is dropped.
    pub async fn serve(
        mut self,
        mut notifications: NotificationReceiver,
        mut requests: RequestReceiver,
        cancel: CancellationToken,
    ) {
        let mut notifications_open = true;
        let mut requests_open = true;

        // Cancellation wins; the two channels are polled in random order.
        while notifications_open || requests_open {
            if cancel.is_cancelled() {
                info!("coordinator cancelled");
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => continue,
                notification = notifications.recv(), if notifications_open => {
                    match notification {
                        Some(notification) => self.handle_notification(notification).await,
                        None => notifications_open = false,
                    }
                }
                envelope = requests.recv(), if requests_open => {
                    match envelope {
                        Some(envelope) => self.handle_request(envelope).await,
                        None => requests_open = false,
                    }
                }
            }
        }

        info!("coordinator stopped");
    }

    /// Opens both channels and runs [`serve`](Coordinator::serve) on a new task.
    pub fn spawn(self, cancel: CancellationToken) -> (Endpoints, JoinHandle<()>) {
        let (notifications, notification_rx) = notification_channel();
        let (requests, request_rx) = request_channel(
            self.settings.request_capacity,
            self.settings.request_timeout,
        );
        let handle = tokio::spawn(self.serve(notification_rx, request_rx, cancel));
        (
            Endpoints {
                notifications,
                requests,
            },
            handle,
        )
    }

    async fn refresh_badge(&mut self) {
        match self.store.get_all().await {
            Ok(links) => {
                self.badge_count = links.len() as i64;
                self.badge.show(&badge_text(self.badge_count));
                trace!(count = self.badge_count, "badge updated");
            }
            Err(e) => warn!(error = %e, "could not count links for the badge"),
        }
    }
}
