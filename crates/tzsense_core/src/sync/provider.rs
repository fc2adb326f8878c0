//! Sync provider contract and error envelope.

use crate::model::timezone_record::{RecordId, TimezoneRecord};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Batch of unsynced records for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPushRequest {
    pub table: String,
    /// Optional remote host taken from configuration.
    pub host: Option<String>,
    pub records: Vec<TimezoneRecord>,
}

/// Provider answer for one pushed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPushResult {
    /// Records the remote side durably accepted.
    pub accepted: Vec<RecordId>,
    pub failed_count: u32,
}

/// Outcome of one `start_sync` call, reported by storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Unsynced rows found before pushing.
    pub pending: usize,
    /// Rows marked as synced after the push.
    pub synced: usize,
}

/// Transport adapter that delivers records to a remote collaborator.
pub trait SyncProvider: Send + Sync {
    fn provider_id(&self) -> &str;
    fn push(&self, request: SyncPushRequest) -> SyncResult<SyncPushResult>;
}

/// Stable error envelope returned by providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    pub provider_id: String,
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl SyncError {
    pub fn new(
        provider_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sync provider `{}` failed ({}): {}",
            self.provider_id, self.code, self.message
        )
    }
}

impl Error for SyncError {}
