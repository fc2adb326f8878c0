//! Timezone change sensor core.
//!
//! Observes a noisy "timezone changed" signal, records each genuinely new
//! timezone exactly once, and notifies storage, an observer and broadcast
//! listeners in a fixed order.

pub mod broadcast;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod signal;
pub mod sink;
pub mod source;
pub mod sync;

pub use broadcast::{BroadcastEvent, BroadcastReceiver, ChannelBroadcaster};
pub use config::{
    ConfigError, ConfigStore, DbType, SensorConfig, TimezoneConfig, DEFAULT_DB_PATH,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::timezone_record::{
    RecordId, RecordValidationError, TimezoneRecord, RECORD_JSON_VERSION, TIMEZONE_TABLE,
};
pub use repo::timezone_repo::{
    RecordListQuery, RecordOrder, SqliteStorageOpener, SqliteTimezoneStorage,
};
pub use repo::{RepoError, RepoResult};
pub use service::change_detector::ChangeDetector;
pub use service::fanout::{FanoutSinks, NotificationFanout, PublishReport, SinkOutcome};
pub use service::record_factory::{Clock, RecordFactory, SystemClock};
pub use service::sensor::{SensorError, SensorState, TimezoneSensor};
pub use service::sync_trigger::SyncTrigger;
pub use signal::{Signal, SignalBus, SignalKind, SubscriptionId};
pub use sink::{
    BroadcastError, BroadcastPayload, Broadcaster, StorageOpener, TimezoneObserver,
    TimezoneStorage, TIMEZONE_CHANGED_EVENT,
};
pub use source::{SourceError, SystemTimezoneSource, TimezoneSource};
pub use sync::{SyncError, SyncProvider, SyncPushRequest, SyncPushResult, SyncSummary};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
