//! In-process signal bus for OS and control signals.
//!
//! # Responsibility
//! - Route timezone-changed and control signals to registered handlers.
//! - Let the sensor register and unregister its handlers explicitly.
//!
//! # Invariants
//! - A signal is delivered only to subscriptions whose kinds match.
//! - Subscriptions whose receiver is gone are pruned on publish.

use crossbeam_channel::Sender;
use log::debug;
use std::sync::{Mutex, PoisonError};

/// Signals consumed by the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// OS timezone changed; no payload, handlers re-read the source.
    TimezoneChanged,
    SetLabel(String),
    Sync,
    /// Start with an optional serialized configuration payload.
    Start(Option<String>),
    /// Start only when the configuration has `enabled = true`.
    StartEnabled,
    Stop,
    StopAll,
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::TimezoneChanged => SignalKind::TimezoneChanged,
            Self::SetLabel(_) => SignalKind::SetLabel,
            Self::Sync => SignalKind::Sync,
            Self::Start(_) => SignalKind::Start,
            Self::StartEnabled => SignalKind::StartEnabled,
            Self::Stop => SignalKind::Stop,
            Self::StopAll => SignalKind::StopAll,
        }
    }
}

/// Payload-free discriminant used for subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    TimezoneChanged,
    SetLabel,
    Sync,
    Start,
    StartEnabled,
    Stop,
    StopAll,
}

pub type SubscriptionId = u64;

struct Subscription {
    id: SubscriptionId,
    kinds: Vec<SignalKind>,
    sender: Sender<Signal>,
}

#[derive(Default)]
struct BusState {
    next_id: SubscriptionId,
    subscriptions: Vec<Subscription>,
}

/// Thread-safe signal registry. Publishers may live on any thread.
#[derive(Default)]
pub struct SignalBus {
    state: Mutex<BusState>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sender` for the given signal kinds.
    pub fn subscribe(&self, kinds: &[SignalKind], sender: Sender<Signal>) -> SubscriptionId {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next_id += 1;
        let id = state.next_id;
        state.subscriptions.push(Subscription {
            id,
            kinds: kinds.to_vec(),
            sender,
        });
        id
    }

    /// Removes one subscription. Returns `false` when it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let before = state.subscriptions.len();
        state.subscriptions.retain(|subscription| subscription.id != id);
        state.subscriptions.len() != before
    }

    /// Delivers `signal` to matching subscriptions; returns delivery count.
    pub fn publish(&self, signal: Signal) -> usize {
        let kind = signal.kind();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;
        state.subscriptions.retain(|subscription| {
            if !subscription.kinds.contains(&kind) {
                return true;
            }
            let alive = subscription.sender.send(signal.clone()).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });
        debug!(
            "event=signal_publish module=signal status=ok kind={:?} delivered={}",
            kind, delivered
        );
        delivered
    }

    /// Counts subscriptions listening for `kind`.
    pub fn subscriber_count(&self, kind: SignalKind) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .subscriptions
            .iter()
            .filter(|subscription| subscription.kinds.contains(&kind))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::{Signal, SignalBus, SignalKind};
    use crossbeam_channel::unbounded;

    #[test]
    fn delivers_only_matching_kinds() {
        let bus = SignalBus::new();
        let (tx, rx) = unbounded();
        bus.subscribe(&[SignalKind::Sync], tx);

        assert_eq!(bus.publish(Signal::TimezoneChanged), 0);
        assert_eq!(bus.publish(Signal::Sync), 1);
        assert_eq!(rx.try_recv().expect("sync signal"), Signal::Sync);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = SignalBus::new();
        let (tx, rx) = unbounded();
        let id = bus.subscribe(&[SignalKind::SetLabel], tx);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(Signal::SetLabel("x".to_string())), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = SignalBus::new();
        let (tx, rx) = unbounded();
        bus.subscribe(&[SignalKind::TimezoneChanged], tx);
        drop(rx);

        assert_eq!(bus.publish(Signal::TimezoneChanged), 0);
        assert_eq!(bus.subscriber_count(SignalKind::TimezoneChanged), 0);
    }
}
