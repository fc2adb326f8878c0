//! Sink contracts consumed by the notification fan-out.
//!
//! # Responsibility
//! - Define the observer, storage and broadcast collaborator interfaces.
//! - Keep sink implementations swappable (SQLite, channels, test doubles).
//!
//! # Invariants
//! - Sinks receive records by shared reference and cannot mutate them.
//! - Observer callbacks run synchronously on the publishing thread.

use crate::config::SensorConfig;
use crate::model::timezone_record::TimezoneRecord;
use crate::repo::RepoResult;
use crate::sync::SyncSummary;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Broadcast event name emitted once per novel timezone.
pub const TIMEZONE_CHANGED_EVENT: &str = "TIMEZONE_CHANGED";

/// Listener notified with every new timezone record.
pub trait TimezoneObserver: Send + Sync {
    fn on_timezone_changed(&self, record: &TimezoneRecord);
}

/// Persistence collaborator for timezone records.
pub trait TimezoneStorage: Send {
    /// Persists one record into `table`.
    fn save(&self, record: &TimezoneRecord, table: &str) -> RepoResult<()>;

    /// Requests remote synchronization of `table`.
    fn start_sync(&self, table: &str) -> RepoResult<SyncSummary>;

    /// Releases storage resources.
    fn close(self: Box<Self>) -> RepoResult<()>;
}

/// Payload carried by [`TIMEZONE_CHANGED_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastPayload {
    pub timezone_id: String,
}

/// Fire-and-forget pub/sub emitter.
pub trait Broadcaster: Send + Sync {
    fn emit(&self, event_name: &str, payload: &BroadcastPayload) -> Result<(), BroadcastError>;
}

/// Broadcast emission failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// The emitter refused the event.
    Rejected { event_name: String, reason: String },
    /// The emitter has been shut down.
    Closed,
}

impl Display for BroadcastError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { event_name, reason } => {
                write!(f, "broadcast `{event_name}` rejected: {reason}")
            }
            Self::Closed => write!(f, "broadcaster is closed"),
        }
    }
}

impl Error for BroadcastError {}

/// Builds the storage collaborator from configuration at sensor start.
pub trait StorageOpener: Send + Sync {
    /// Returns `Ok(None)` when configuration disables persistence.
    fn open(&self, config: &SensorConfig) -> RepoResult<Option<Box<dyn TimezoneStorage>>>;
}
