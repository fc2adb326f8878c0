//! Timezone record model.
//!
//! # Responsibility
//! - Define the immutable record persisted to `timezoneData`.
//! - Validate persisted/incoming shape before storage.
//!
//! # Invariants
//! - `timezone_id` is never empty.
//! - `uuid` is stable and never reused for another record.
//! - `device_id` and `label` are copied from configuration at build time and
//!   may be empty.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one timezone record.
pub type RecordId = Uuid;

/// Table name used by every storage collaborator for timezone history.
pub const TIMEZONE_TABLE: &str = "timezoneData";

/// Envelope version written with each record.
pub const RECORD_JSON_VERSION: u32 = 1;

/// One observed timezone change.
///
/// Fields are private; use accessors. Construct through
/// [`TimezoneRecord::new`] or `RecordFactory::build`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimezoneRecord {
    uuid: RecordId,
    timezone_id: String,
    /// Unix epoch milliseconds at creation time.
    timestamp: i64,
    device_id: String,
    label: String,
    json_version: u32,
}

impl TimezoneRecord {
    /// Creates a record with a generated stable ID.
    pub fn new(
        timezone_id: impl Into<String>,
        timestamp: i64,
        device_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), timezone_id, timestamp, device_id, label)
    }

    /// Creates a record with a caller-provided stable ID.
    ///
    /// Used by storage read paths where identity already exists.
    pub fn with_id(
        uuid: RecordId,
        timezone_id: impl Into<String>,
        timestamp: i64,
        device_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            timezone_id: timezone_id.into(),
            timestamp,
            device_id: device_id.into(),
            label: label.into(),
            json_version: RECORD_JSON_VERSION,
        }
    }

    pub fn uuid(&self) -> RecordId {
        self.uuid
    }

    pub fn timezone_id(&self) -> &str {
        &self.timezone_id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn json_version(&self) -> u32 {
        self.json_version
    }

    /// Validates record invariants.
    ///
    /// # Errors
    /// - [`RecordValidationError::EmptyTimezoneId`] when the id is blank.
    /// - [`RecordValidationError::NegativeTimestamp`] when the timestamp is
    ///   before the unix epoch.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if self.timezone_id.trim().is_empty() {
            return Err(RecordValidationError::EmptyTimezoneId);
        }
        if self.timestamp < 0 {
            return Err(RecordValidationError::NegativeTimestamp(self.timestamp));
        }
        Ok(())
    }
}

impl Display for TimezoneRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "timezone_id={} timestamp={} device_id={} uuid={}",
            self.timezone_id, self.timestamp, self.device_id, self.uuid
        )
    }
}

/// Validation failures for [`TimezoneRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    EmptyTimezoneId,
    NegativeTimestamp(i64),
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTimezoneId => write!(f, "timezone id must not be empty"),
            Self::NegativeTimestamp(value) => {
                write!(f, "timestamp must not be negative, got {value}")
            }
        }
    }
}

impl Error for RecordValidationError {}
