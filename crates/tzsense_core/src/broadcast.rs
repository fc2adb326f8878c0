//! In-process broadcast emitter backed by `tokio::sync::broadcast`.
//!
//! Receivers can be drained synchronously with `try_recv`/`blocking_recv`;
//! no async runtime is required.

use crate::sink::{BroadcastError, BroadcastPayload, Broadcaster};
use log::debug;
use tokio::sync::broadcast;

/// Events buffered per receiver before the oldest ones are dropped.
const BROADCAST_CAPACITY: usize = 64;

/// One emitted broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastEvent {
    pub name: String,
    pub payload: BroadcastPayload,
}

pub type BroadcastReceiver = broadcast::Receiver<BroadcastEvent>;

/// Fans broadcasts out to every live receiver.
///
/// Emitting with no receivers succeeds. A receiver that falls more than
/// `BROADCAST_CAPACITY` events behind sees `Lagged` and skips ahead.
#[derive(Debug)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> BroadcastReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn emit(&self, event_name: &str, payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        let event = BroadcastEvent {
            name: event_name.to_string(),
            payload: payload.clone(),
        };
        // `send` only fails when nobody is listening.
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(
            "event=broadcast_emit module=broadcast status=ok name={} receivers={}",
            event_name, receivers
        );
        Ok(())
    }
}
