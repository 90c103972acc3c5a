use crate::error::{CoordinatorError, Result};
use crate::message::{Notification, RemoveResponse, Request};
use look_later_core::LinkKey;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Sending half of the fire-and-forget notification channel.
///
/// Sending never waits on the coordinator.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<Notification>,
}

pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Creates the channel capture relays and menu handlers use to reach the
/// coordinator.
pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (NotificationSender { tx }, rx)
}

impl NotificationSender {
    pub fn notify(&self, notification: Notification) -> Result<()> {
        self.tx.send(notification).map_err(|e| {
            warn!(message = ?e.0, "coordinator is gone, notification dropped");
            CoordinatorError::Channel("notification channel closed".to_string())
        })
    }
}

/// A request travelling to the coordinator with the slot for its reply.
#[derive(Debug)]
pub struct RequestEnvelope {
    pub request: Request,
    pub reply: oneshot::Sender<RemoveResponse>,
}

pub type RequestReceiver = mpsc::Receiver<RequestEnvelope>;

/// Client half of the request/response channel, used by popups.
#[derive(Debug, Clone)]
pub struct RemoveClient {
    tx: mpsc::Sender<RequestEnvelope>,
    timeout: Duration,
}

/// Creates the request/response channel. `timeout` bounds each round-trip.
pub fn request_channel(capacity: usize, timeout: Duration) -> (RemoveClient, RequestReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (RemoveClient { tx, timeout }, rx)
}

impl RemoveClient {
    /// Asks the coordinator to delete `key` and waits for its answer.
    ///
    /// Returns `Ok(())` only when the coordinator confirmed the removal.
    pub async fn remove_link(&self, key: LinkKey) -> Result<()> {
        debug!(key = %key, "requesting link removal");
        let (reply, response) = oneshot::channel();
        let envelope = RequestEnvelope {
            request: Request::Remove(key.clone()),
            reply,
        };

        let round_trip = async {
            self.tx.send(envelope).await.map_err(|_| {
                CoordinatorError::Channel("request channel closed".to_string())
            })?;
            response.await.map_err(|_| {
                CoordinatorError::Channel("coordinator dropped the reply".to_string())
            })
        };

        let response = match tokio::time::timeout(self.timeout, round_trip).await {
            Ok(response) => response?,
            Err(_) => {
                warn!(key = %key, timeout_ms = self.timeout.as_millis(), "remove request timed out");
                return Err(CoordinatorError::Timeout(format!("remove {key}")));
            }
        };

        if response.success {
            Ok(())
        } else {
            Err(CoordinatorError::Rejected(format!("remove request for {key} failed")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_fails_once_receiver_dropped() {
        let (sender, receiver) = notification_channel();
        drop(receiver);

        let err = sender.notify(Notification::MenuClick("ll_add".into())).unwrap_err();
        assert!(matches!(err, CoordinatorError::Channel(_)));
    }

    #[tokio::test]
    async fn remove_link_maps_reply() {
        let (client, mut requests) = request_channel(4, Duration::from_secs(1));
        tokio::spawn(async move {
            while let Some(envelope) = requests.recv().await {
                let Request::Remove(key) = envelope.request;
                let _ = envelope.reply.send(RemoveResponse {
                    success: key.as_str() == "1",
                });
            }
        });

        assert!(client.remove_link(LinkKey::from(1)).await.is_ok());
        let err = client.remove_link(LinkKey::from(2)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Rejected(_)));
    }

    #[tokio::test]
    async fn dropped_reply_is_channel_error() {
        let (client, mut requests) = request_channel(4, Duration::from_secs(1));
        tokio::spawn(async move {
            if let Some(envelope) = requests.recv().await {
                drop(envelope.reply);
            }
        });

        let err = client.remove_link(LinkKey::from(1)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Channel(_)));
    }

    #[tokio::test]
    async fn closed_channel_is_channel_error() {
        let (client, requests) = request_channel(4, Duration::from_secs(1));
        drop(requests);

        let err = client.remove_link(LinkKey::from(1)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Channel(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_coordinator_times_out() {
        let (client, _requests) = request_channel(4, Duration::from_secs(2));

        let err = client.remove_link(LinkKey::from(1)).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Timeout(_)));
    }
}
