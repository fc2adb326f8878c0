//! Persistence implementations for timezone history.
//!
//! # Responsibility
//! - Provide the SQLite-backed `TimezoneStorage` adapter.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `TimezoneRecord::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod timezone_repo;

use crate::db::DbError;
use crate::model::timezone_record::RecordValidationError;
use crate::sync::SyncError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage failure taxonomy.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    Db(DbError),
    /// The caller addressed a table this storage does not own.
    UnknownTable(String),
    InvalidData(String),
    Sync(SyncError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownTable(table) => write!(f, "unknown table: {table}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::Sync(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::UnknownTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SyncError> for RepoError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}
