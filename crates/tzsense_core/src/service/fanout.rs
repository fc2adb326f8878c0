//! Notification fan-out for new timezone records.
//!
//! # Invariants
//! - Delivery order is storage, then observer, then broadcast.
//! - Every sink is attempted regardless of earlier sink failures: storage
//!   and broadcast errors are captured, and a panic in any sink is caught.
//! - No deduplication happens here; callers publish only novel records.

use crate::config::TimezoneConfig;
use crate::logging::sensor_debug;
use crate::model::timezone_record::{TimezoneRecord, TIMEZONE_TABLE};
use crate::sink::{BroadcastPayload, Broadcaster, TimezoneStorage, TIMEZONE_CHANGED_EVENT};
use log::{error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result of delivering one record to one sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Delivered,
    /// The sink is not configured (no storage, no live observer).
    Skipped,
    Failed(String),
}

impl SinkOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Per-sink outcomes of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub storage: SinkOutcome,
    pub observer: SinkOutcome,
    pub broadcast: SinkOutcome,
}

impl PublishReport {
    pub fn all_delivered(&self) -> bool {
        self.storage.is_delivered() && self.observer.is_delivered() && self.broadcast.is_delivered()
    }
}

/// Sinks a record is delivered to. The observer comes from configuration.
pub struct FanoutSinks<'a> {
    pub storage: Option<&'a dyn TimezoneStorage>,
    pub broadcaster: &'a dyn Broadcaster,
}

/// Stateless publisher; see module invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFanout;

impl NotificationFanout {
    pub fn new() -> Self {
        Self
    }

    /// Delivers `record` to storage, observer and broadcast, in that order.
    ///
    /// The observer runs synchronously on the calling thread.
    pub fn publish(
        &self,
        record: &TimezoneRecord,
        config: &TimezoneConfig,
        sinks: &FanoutSinks<'_>,
    ) -> PublishReport {
        let storage = persist(record, sinks.storage);
        let observer = notify_observer(record, config);
        let broadcast = emit_broadcast(record, sinks.broadcaster);

        sensor_debug!(
            config.sensor.debug,
            "event=timezone_publish module=fanout status=done record={} storage={:?} observer={:?} broadcast={:?}",
            record,
            storage,
            observer,
            broadcast
        );

        PublishReport {
            storage,
            observer,
            broadcast,
        }
    }
}

fn persist(record: &TimezoneRecord, storage: Option<&dyn TimezoneStorage>) -> SinkOutcome {
    let Some(storage) = storage else {
        return SinkOutcome::Skipped;
    };
    match catch_unwind(AssertUnwindSafe(|| storage.save(record, TIMEZONE_TABLE))) {
        Ok(Ok(())) => SinkOutcome::Delivered,
        Ok(Err(err)) => {
            error!(
                "event=timezone_publish module=fanout status=error sink=storage table={} error={}",
                TIMEZONE_TABLE, err
            );
            SinkOutcome::Failed(err.to_string())
        }
        Err(_) => {
            error!("event=timezone_publish module=fanout status=error sink=storage error=storage_panicked");
            SinkOutcome::Failed("storage panicked".to_string())
        }
    }
}

fn notify_observer(record: &TimezoneRecord, config: &TimezoneConfig) -> SinkOutcome {
    let Some(observer) = config.live_observer() else {
        return SinkOutcome::Skipped;
    };
    match catch_unwind(AssertUnwindSafe(|| observer.on_timezone_changed(record))) {
        Ok(()) => SinkOutcome::Delivered,
        Err(_) => {
            error!("event=timezone_publish module=fanout status=error sink=observer error=observer_panicked");
            SinkOutcome::Failed("observer panicked".to_string())
        }
    }
}

fn emit_broadcast(record: &TimezoneRecord, broadcaster: &dyn Broadcaster) -> SinkOutcome {
    let payload = BroadcastPayload {
        timezone_id: record.timezone_id().to_string(),
    };
    match catch_unwind(AssertUnwindSafe(|| {
        broadcaster.emit(TIMEZONE_CHANGED_EVENT, &payload)
    })) {
        Ok(Ok(())) => SinkOutcome::Delivered,
        Ok(Err(err)) => {
            warn!(
                "event=timezone_publish module=fanout status=error sink=broadcast name={} error={}",
                TIMEZONE_CHANGED_EVENT, err
            );
            SinkOutcome::Failed(err.to_string())
        }
        Err(_) => {
            error!("event=timezone_publish module=fanout status=error sink=broadcast error=broadcast_panicked");
            SinkOutcome::Failed("broadcast panicked".to_string())
        }
    }
}
