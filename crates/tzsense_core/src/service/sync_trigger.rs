//! Forwards external sync requests to storage.

use crate::model::timezone_record::TIMEZONE_TABLE;
use crate::repo::RepoResult;
use crate::sink::TimezoneStorage;
use crate::sync::SyncSummary;
use log::{error, info};

/// Stateless sync forwarder for the `timezoneData` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncTrigger;

impl SyncTrigger {
    pub fn new() -> Self {
        Self
    }

    /// Asks `storage` to sync `timezoneData`.
    ///
    /// Returns `None` when no storage is configured. The storage result is
    /// logged and handed back; the trigger itself never fails.
    pub fn sync(&self, storage: Option<&dyn TimezoneStorage>) -> Option<RepoResult<SyncSummary>> {
        let Some(storage) = storage else {
            info!(
                "event=sync_trigger module=service status=skipped reason=no_storage table={}",
                TIMEZONE_TABLE
            );
            return None;
        };

        let result = storage.start_sync(TIMEZONE_TABLE);
        match &result {
            Ok(summary) => info!(
                "event=sync_trigger module=service status=ok table={} pending={} synced={}",
                TIMEZONE_TABLE, summary.pending, summary.synced
            ),
            Err(err) => error!(
                "event=sync_trigger module=service status=error table={} error={}",
                TIMEZONE_TABLE, err
            ),
        }
        Some(result)
    }
}
