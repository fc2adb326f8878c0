//! SQLite-backed timezone storage.
//!
//! # Responsibility
//! - Persist timezone records into the `timezoneData` table.
//! - Push unsynced rows through an optional sync provider.
//!
//! # Invariants
//! - Only `timezoneData` is addressable; other table names are rejected.
//! - `synced_at` is stamped only for rows the provider accepted.

use crate::config::{DbType, SensorConfig};
use crate::db::{open_db, open_db_in_memory};
use crate::model::timezone_record::{TimezoneRecord, TIMEZONE_TABLE};
use crate::repo::{RepoError, RepoResult};
use crate::sink::{StorageOpener, TimezoneStorage};
use crate::sync::{SyncProvider, SyncPushRequest, SyncSummary};
use log::{error, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::Arc;
use uuid::Uuid;

const IN_MEMORY_DB_PATH: &str = ":memory:";

const RECORD_SELECT_SQL: &str = "SELECT
    uuid,
    timezone_id,
    timestamp,
    device_id,
    label,
    json_version
FROM timezoneData";

/// Read order for [`RecordListQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Query options for listing stored records.
#[derive(Debug, Clone, Default)]
pub struct RecordListQuery {
    pub pending_sync_only: bool,
    pub order: RecordOrder,
    pub limit: Option<u32>,
}

/// SQLite implementation of [`TimezoneStorage`].
pub struct SqliteTimezoneStorage {
    conn: Connection,
    sync_provider: Option<Arc<dyn SyncProvider>>,
    sync_host: Option<String>,
}

impl SqliteTimezoneStorage {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            sync_provider: None,
            sync_host: None,
        }
    }

    pub fn with_sync_provider(mut self, provider: Arc<dyn SyncProvider>) -> Self {
        self.sync_provider = Some(provider);
        self
    }

    pub fn with_sync_host(mut self, host: Option<String>) -> Self {
        self.sync_host = host;
        self
    }

    /// Lists stored records using order/filter/limit options.
    pub fn list_records(&self, query: &RecordListQuery) -> RepoResult<Vec<TimezoneRecord>> {
        let mut sql = format!("{RECORD_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if query.pending_sync_only {
            sql.push_str(" AND synced_at IS NULL");
        }

        match query.order {
            RecordOrder::NewestFirst => sql.push_str(" ORDER BY timestamp DESC, rowid DESC"),
            RecordOrder::OldestFirst => sql.push_str(" ORDER BY timestamp ASC, rowid ASC"),
        }

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    /// Returns the number of stored records.
    pub fn count_records(&self) -> RepoResult<u64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM timezoneData;", [], |row| {
                row.get::<_, i64>(0)
            })?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count `{count}`")))
    }

    fn mark_synced(&self, ids: &[Uuid]) -> RepoResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE timezoneData
                 SET synced_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1 AND synced_at IS NULL;",
            )?;
            for id in ids {
                changed += stmt.execute([id.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(changed)
    }
}

impl TimezoneStorage for SqliteTimezoneStorage {
    fn save(&self, record: &TimezoneRecord, table: &str) -> RepoResult<()> {
        ensure_timezone_table(table)?;
        record.validate()?;

        self.conn.execute(
            "INSERT INTO timezoneData (
                uuid,
                timezone_id,
                timestamp,
                device_id,
                label,
                json_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                record.uuid().to_string(),
                record.timezone_id(),
                record.timestamp(),
                record.device_id(),
                record.label(),
                record.json_version(),
            ],
        )?;
        Ok(())
    }

    fn start_sync(&self, table: &str) -> RepoResult<SyncSummary> {
        ensure_timezone_table(table)?;

        let pending = self.list_records(&RecordListQuery {
            pending_sync_only: true,
            order: RecordOrder::OldestFirst,
            limit: None,
        })?;
        let pending_count = pending.len();

        let Some(provider) = self.sync_provider.as_ref() else {
            info!(
                "event=storage_sync module=repo status=skipped reason=no_provider table={} pending={}",
                table, pending_count
            );
            return Ok(SyncSummary {
                pending: pending_count,
                synced: 0,
            });
        };

        if pending.is_empty() {
            return Ok(SyncSummary::default());
        }

        let result = provider.push(SyncPushRequest {
            table: table.to_string(),
            host: self.sync_host.clone(),
            records: pending,
        })?;
        let synced = self.mark_synced(&result.accepted)?;

        info!(
            "event=storage_sync module=repo status=ok provider={} table={} pending={} synced={} failed={}",
            provider.provider_id(),
            table,
            pending_count,
            synced,
            result.failed_count
        );
        Ok(SyncSummary {
            pending: pending_count,
            synced,
        })
    }

    fn close(self: Box<Self>) -> RepoResult<()> {
        self.conn.close().map_err(|(_, err)| RepoError::from(err))
    }
}

/// Opens [`SqliteTimezoneStorage`] from sensor configuration.
#[derive(Default)]
pub struct SqliteStorageOpener {
    sync_provider: Option<Arc<dyn SyncProvider>>,
}

impl SqliteStorageOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sync_provider(mut self, provider: Arc<dyn SyncProvider>) -> Self {
        self.sync_provider = Some(provider);
        self
    }
}

impl StorageOpener for SqliteStorageOpener {
    fn open(&self, config: &SensorConfig) -> RepoResult<Option<Box<dyn TimezoneStorage>>> {
        if config.db_type == DbType::None {
            info!("event=storage_open module=repo status=skipped reason=db_type_none");
            return Ok(None);
        }
        if config.db_encryption_key.is_some() {
            warn!("event=storage_open module=repo status=warn reason=encryption_unsupported");
        }

        let opened = if config.db_path == IN_MEMORY_DB_PATH {
            open_db_in_memory()
        } else {
            open_db(&config.db_path)
        };
        let conn = opened.map_err(|err| {
            error!(
                "event=storage_open module=repo status=error path={} error={}",
                config.db_path, err
            );
            RepoError::from(err)
        })?;

        let mut storage = SqliteTimezoneStorage::new(conn).with_sync_host(config.db_host.clone());
        if let Some(provider) = &self.sync_provider {
            storage = storage.with_sync_provider(Arc::clone(provider));
        }
        Ok(Some(Box::new(storage)))
    }
}

fn ensure_timezone_table(table: &str) -> RepoResult<()> {
    if table == TIMEZONE_TABLE {
        Ok(())
    } else {
        Err(RepoError::UnknownTable(table.to_string()))
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<TimezoneRecord> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in timezoneData.uuid"
        ))
    })?;

    let json_version: u32 = row.get("json_version")?;
    let record = TimezoneRecord::with_id(
        uuid,
        row.get::<_, String>("timezone_id")?,
        row.get::<_, i64>("timestamp")?,
        row.get::<_, String>("device_id")?,
        row.get::<_, String>("label")?,
    );
    if record.json_version() != json_version {
        return Err(RepoError::InvalidData(format!(
            "unsupported json_version `{json_version}` in timezoneData.json_version"
        )));
    }
    record.validate()?;
    Ok(record)
}
