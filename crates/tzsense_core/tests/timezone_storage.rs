use std::sync::{Arc, Mutex};
use tzsense_core::db::migrations::{current_user_version, latest_version};
use tzsense_core::db::{open_db, open_db_in_memory, DbError};
use tzsense_core::{
    RecordListQuery, RecordOrder, RepoError, SqliteTimezoneStorage, SyncError, SyncProvider,
    SyncPushRequest, SyncPushResult, TimezoneRecord, TimezoneStorage, TIMEZONE_TABLE,
};

/// Accepts every other record of each pushed batch.
struct HalfAcceptingProvider {
    pushed: Mutex<Vec<SyncPushRequest>>,
}

impl SyncProvider for HalfAcceptingProvider {
    fn provider_id(&self) -> &str {
        "half"
    }

    fn push(&self, request: SyncPushRequest) -> Result<SyncPushResult, SyncError> {
        let accepted = request
            .records
            .iter()
            .step_by(2)
            .map(|record| record.uuid())
            .collect::<Vec<_>>();
        let failed_count = (request.records.len() - accepted.len()) as u32;
        self.pushed.lock().expect("lock").push(request);
        Ok(SyncPushResult {
            accepted,
            failed_count,
        })
    }
}

struct OfflineProvider;

impl SyncProvider for OfflineProvider {
    fn provider_id(&self) -> &str {
        "offline"
    }

    fn push(&self, _request: SyncPushRequest) -> Result<SyncPushResult, SyncError> {
        Err(SyncError::new("offline", "network_unreachable", "no route", true))
    }
}

fn record(zone: &str, ts: i64) -> TimezoneRecord {
    TimezoneRecord::new(zone, ts, "dev-1", "study")
}

#[test]
fn migrations_set_latest_user_version() {
    let conn = open_db_in_memory().expect("in-memory db");
    assert_eq!(current_user_version(&conn).expect("user_version"), latest_version());
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("future.sqlite3");
    {
        let conn = rusqlite::Connection::open(&path).expect("raw sqlite open");
        conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version() + 1))
            .expect("query");
    }

    let err = open_db(&path).expect_err("operation should fail");
    assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
}

#[test]
fn records_survive_close_and_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tz.sqlite3");

    let storage = Box::new(SqliteTimezoneStorage::new(open_db(&path).expect("file db")));
    let saved = record("Pacific/Auckland", 100);
    storage.save(&saved, TIMEZONE_TABLE).expect("save");
    storage.close().expect("close");

    let reopened = SqliteTimezoneStorage::new(open_db(&path).expect("file db"));
    let records = reopened.list_records(&RecordListQuery::default()).expect("list");
    assert_eq!(records, vec![saved]);
}

#[test]
fn sync_marks_only_accepted_records() {
    let provider = Arc::new(HalfAcceptingProvider {
        pushed: Mutex::new(Vec::new()),
    });
    let storage = SqliteTimezoneStorage::new(open_db_in_memory().expect("in-memory db"))
        .with_sync_provider(provider.clone())
        .with_sync_host(Some("sync.example.org".to_string()));
    for (zone, ts) in [("UTC", 1), ("Europe/Rome", 2), ("Asia/Seoul", 3)] {
        storage.save(&record(zone, ts), TIMEZONE_TABLE).expect("save");
    }

    let summary = storage.start_sync(TIMEZONE_TABLE).expect("sync");
    assert_eq!(summary.pending, 3);
    assert_eq!(summary.synced, 2);

    let pushed = provider.pushed.lock().expect("lock");
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].host.as_deref(), Some("sync.example.org"));
    let pushed_zones: Vec<&str> = pushed[0].records.iter().map(|r| r.timezone_id()).collect();
    assert_eq!(pushed_zones, vec!["UTC", "Europe/Rome", "Asia/Seoul"]);
    drop(pushed);

    let pending = storage
        .list_records(&RecordListQuery {
            pending_sync_only: true,
            order: RecordOrder::OldestFirst,
            limit: None,
        })
        .expect("query");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].timezone_id(), "Europe/Rome");
}

#[test]
fn provider_error_leaves_rows_pending() {
    let storage = SqliteTimezoneStorage::new(open_db_in_memory().expect("in-memory db"))
        .with_sync_provider(Arc::new(OfflineProvider));
    storage.save(&record("UTC", 1), TIMEZONE_TABLE).expect("save");

    let err = storage.start_sync(TIMEZONE_TABLE).expect_err("operation should fail");
    assert!(matches!(err, RepoError::Sync(ref inner) if inner.retryable));

    let pending = storage
        .list_records(&RecordListQuery {
            pending_sync_only: true,
            ..RecordListQuery::default()
        })
        .expect("query");
    assert_eq!(pending.len(), 1);
}

#[test]
fn sync_rejects_foreign_table() {
    let storage = SqliteTimezoneStorage::new(open_db_in_memory().expect("in-memory db"));
    let err = storage.start_sync("locationData").expect_err("operation should fail");
    assert!(matches!(err, RepoError::UnknownTable(_)));
}
