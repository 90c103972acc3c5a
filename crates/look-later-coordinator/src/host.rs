//! Native-messaging host session.
//!
//! Bridges a browser connection (framed JSON on a byte stream) to a running
//! [`Coordinator`]. Inbound `link` and `menu_click` messages become
//! notifications; `remove` messages are answered, in the order they arrived,
//! with `{"success": bool, "payload": "<key>"}`. Badge changes are pushed to
//! the browser as `{"type": "badge", ...}`.

use crate::badge::BadgeSurface;
use crate::coordinator::{Coordinator, CoordinatorSettings, Endpoints};
use crate::channel::RemoveClient;
use crate::message::Notification;
use crate::wire::{self, WireError, WireResult};
use look_later_core::{LinkKey, LinkRecord, LinkStore};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything the browser may send to the host.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Inbound {
    #[serde(rename = "link")]
    Link(LinkRecord),
    #[serde(rename = "menu_click")]
    MenuClick(String),
    #[serde(rename = "remove")]
    Remove(LinkKey),
}

/// Unsolicited host-to-browser events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum HostEvent {
    #[serde(rename = "badge")]
    Badge(String),
}

/// Answer to a browser `remove`, carrying the key it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveReply {
    pub success: bool,
    #[serde(rename = "payload")]
    pub key: LinkKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Event(HostEvent),
    Reply(RemoveReply),
}

/// Pushes badge text to the browser.
#[derive(Debug, Clone)]
pub struct ChannelBadge {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl BadgeSurface for ChannelBadge {
    fn show(&self, text: &str) {
        let event = Outbound::Event(HostEvent::Badge(text.to_string()));
        if self.tx.send(event).is_err() {
            debug!("browser output closed, badge update dropped");
        }
    }
}

/// Runs one browser connection to completion.
///
/// Returns when the browser closes `input`, when `cancel` fires, or when the
/// stream breaks. Malformed messages are logged and skipped.
pub async fn run_session<S, R, W>(
    store: S,
    settings: CoordinatorSettings,
    mut input: R,
    output: W,
    cancel: CancellationToken,
) -> WireResult<()>
where
    S: LinkStore,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_outbound(output, out_rx));

    let mut coordinator = Coordinator::new(store, ChannelBadge { tx: out_tx.clone() }, settings);
    coordinator.start().await;
    let (endpoints, coordinator_task) = coordinator.spawn(cancel.child_token());

    let (remove_tx, remove_rx) = mpsc::unbounded_channel();
    let remover = tokio::spawn(serve_removes(
        endpoints.requests.clone(),
        remove_rx,
        out_tx.clone(),
    ));

    let outcome = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                info!("session cancelled");
                break Ok(());
            }
            frame = wire::read_frame(&mut input) => frame,
        };

        match frame {
            Ok(Some(frame)) => match serde_json::from_slice::<Inbound>(&frame) {
                Ok(message) => dispatch(&endpoints, &remove_tx, message),
                Err(e) => warn!(error = %e, "skipping malformed message"),
            },
            Ok(None) => {
                info!("browser closed the connection");
                break Ok(());
            }
            Err(e) => {
                warn!(error = %e, "failed to read from browser");
                break Err(e);
            }
        }
    };

    drop(remove_tx);
    if let Err(e) = remover.await {
        warn!(error = %e, "remove task failed");
    }
    drop(endpoints);
    if let Err(e) = coordinator_task.await {
        warn!(error = %e, "coordinator task failed");
    }
    drop(out_tx);
    if let Err(e) = writer.await {
        warn!(error = %e, "output task failed");
    }

    outcome
}

fn dispatch(endpoints: &Endpoints, removes: &mpsc::UnboundedSender<LinkKey>, message: Inbound) {
    let notification = match message {
        Inbound::Link(record) => Notification::Link(record),
        Inbound::MenuClick(menu_item_id) => Notification::MenuClick(menu_item_id),
        Inbound::Remove(key) => {
            if let Err(e) = removes.send(key) {
                warn!(key = %e.0, "remove queue closed, request dropped");
            }
            return;
        }
    };

    if let Err(e) = endpoints.notifications.notify(notification) {
        warn!(error = %e, "coordinator unavailable");
    }
}

/// Runs remove round-trips one at a time so replies keep request order.
async fn serve_removes(
    client: RemoveClient,
    mut keys: mpsc::UnboundedReceiver<LinkKey>,
    out: mpsc::UnboundedSender<Outbound>,
) {
    while let Some(key) = keys.recv().await {
        let success = match client.remove_link(key.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "remove failed");
                false
            }
        };
        if out.send(Outbound::Reply(RemoveReply { success, key })).is_err() {
            debug!("browser output closed, reply dropped");
        }
    }
}

async fn write_outbound<W>(mut output: W, mut rx: mpsc::UnboundedReceiver<Outbound>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        match wire::write_message(&mut output, &message).await {
            Ok(()) => {}
            Err(WireError::Io(e)) => {
                warn!(error = %e, "browser output broken");
                break;
            }
            Err(e) => warn!(error = %e, "dropping unsendable message"),
        }
    }
}
