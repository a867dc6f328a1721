use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use futures_util::{Stream, stream};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::util::now_millis;

pub type ChannelId = u64;

/// A serialized notification, shared by every channel it is sent to.
pub type Frame = Arc<str>;

pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Notification<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    auction_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    timestamp: i64,
}

fn encode(kind: &str, auction_id: Option<u64>, data: Option<&serde_json::Value>) -> Frame {
    let note = Notification {
        kind,
        auction_id,
        data,
        timestamp: now_millis(),
    };
    match serde_json::to_string(&note) {
        Ok(json) => json.into(),
        // Value and primitives always serialize.
        Err(_) => Arc::from("{}"),
    }
}

/// First frame every subscriber receives.
pub fn connected_frame() -> Frame {
    encode("connected", None, None)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    channels: Mutex<HashMap<ChannelId, mpsc::Sender<Frame>>>,
}

/// Fan-out of change notifications to live subscribers. A channel that is
/// closed or cannot keep up is dropped without affecting the others.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sender: mpsc::Sender<Frame>) -> ChannelId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut channels = self.inner.channels.lock();
            channels.insert(id, sender);
            channels.len()
        };
        crate::metrics::set_broadcast_channels(count);
        debug!("registered push channel {id} ({count} open)");
        id
    }

    pub fn unregister(&self, id: ChannelId) -> bool {
        let (removed, count) = {
            let mut channels = self.inner.channels.lock();
            let removed = channels.remove(&id).is_some();
            (removed, channels.len())
        };
        if removed {
            crate::metrics::set_broadcast_channels(count);
            debug!("unregistered push channel {id} ({count} open)");
        }
        removed
    }

    /// Registers a fresh bounded channel. Dropping the subscription
    /// unregisters it.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let id = self.register(tx);
        Subscription {
            id,
            hub: self.clone(),
            receiver: rx,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn broadcast(
        &self,
        kind: &str,
        auction_id: Option<u64>,
        data: serde_json::Value,
    ) -> BroadcastReport {
        let frame = encode(kind, auction_id, Some(&data));
        let mut report = BroadcastReport::default();

        let remaining = {
            let mut channels = self.inner.channels.lock();
            channels.retain(|id, sender| match sender.try_send(frame.clone()) {
                Ok(()) => {
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    warn!("dropping push channel {id}: {e}");
                    report.dropped += 1;
                    false
                }
            });
            channels.len()
        };

        if report.dropped > 0 {
            crate::metrics::record_broadcast_dropped(report.dropped);
            crate::metrics::set_broadcast_channels(remaining);
        }
        report
    }
}

pub struct Subscription {
    id: ChannelId,
    hub: BroadcastHub,
    receiver: mpsc::Receiver<Frame>,
}

impl Subscription {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = Frame> + Send + 'static {
        stream::unfold(self, |mut sub| async move {
            let frame = sub.recv().await?;
            Some((frame, sub))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unregister(self.id);
    }
}
