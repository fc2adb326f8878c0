//! Record construction for novel timezone ids.

use crate::config::SensorConfig;
use crate::model::timezone_record::TimezoneRecord;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock source in unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// [`Clock`] backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        // A clock set before the epoch yields 0 rather than a negative stamp.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}

/// Builds immutable records stamped by a [`Clock`].
pub struct RecordFactory<C: Clock = SystemClock> {
    clock: C,
}

impl Default for RecordFactory<SystemClock> {
    fn default() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> RecordFactory<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    /// Copies device id and label from `config`; samples the timestamp now.
    pub fn build(&self, timezone_id: &str, config: &SensorConfig) -> TimezoneRecord {
        TimezoneRecord::new(
            timezone_id,
            self.clock.now_ms(),
            config.device_id.as_str(),
            config.label.as_str(),
        )
    }
}
