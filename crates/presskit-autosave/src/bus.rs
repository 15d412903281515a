//! Broadcast bus for save notifications.
//!
//! Each event type has its own channel, and a wildcard channel carries every
//! event serialized to JSON for log sinks. The bus is a [`Notifier`], so a
//! coordinator can publish straight onto it:
//!
//! ```ignore
//! let bus = Bus::new();
//! let mut toasts = bus.subscribe::<Toast>();
//! let autosave = DocumentAutoSave::builder(persist)
//!     .notifier(Arc::new(bus.clone()))
//!     .spawn();
//! ```

use crate::notify::{Notifier, SaveSettled, Toast};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

const CAPACITY: usize = 256;

/// An event type the bus has a channel for.
pub trait Event: Clone + Serialize + Send + Sync + 'static {
    /// Name carried by the wildcard channel.
    const NAME: &'static str;

    fn channel(bus: &Bus) -> &broadcast::Sender<Self>;
}

impl Event for Toast {
    const NAME: &'static str = "toast.shown";

    fn channel(bus: &Bus) -> &broadcast::Sender<Self> {
        &bus.channels.toasts
    }
}

impl Event for SaveSettled {
    const NAME: &'static str = "save.settled";

    fn channel(bus: &Bus) -> &broadcast::Sender<Self> {
        &bus.channels.settled
    }
}

/// An event as seen by wildcard subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

#[derive(Clone)]
pub struct Bus {
    channels: Arc<Channels>,
}

struct Channels {
    toasts: broadcast::Sender<Toast>,
    settled: broadcast::Sender<SaveSettled>,
    all: broadcast::Sender<BusEvent>,
}

impl Bus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Channels {
                toasts: broadcast::channel(CAPACITY).0,
                settled: broadcast::channel(CAPACITY).0,
                all: broadcast::channel(CAPACITY).0,
            }),
        }
    }

    /// Deliver `event` to current subscribers. Nothing is buffered for
    /// subscribers that arrive later.
    pub fn publish<E: Event>(&self, event: E) {
        if self.channels.all.receiver_count() > 0 {
            match serde_json::to_value(&event) {
                Ok(payload) => {
                    let _ = self.channels.all.send(BusEvent {
                        event_type: E::NAME.to_string(),
                        payload,
                    });
                }
                Err(e) => trace!(event = E::NAME, error = %e, "Event not serializable"),
            }
        }
        let _ = E::channel(self).send(event);
    }

    pub fn subscribe<E: Event>(&self) -> broadcast::Receiver<E> {
        E::channel(self).subscribe()
    }

    /// Every event, as JSON.
    pub fn subscribe_all(&self) -> broadcast::Receiver<BusEvent> {
        self.channels.all.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for Bus {
    async fn notify(&self, toast: Toast) {
        self.publish(toast);
    }

    async fn settled(&self, report: SaveSettled) {
        self.publish(report);
    }
}
