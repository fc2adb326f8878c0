//! Timezone sources.
//!
//! The OS-level "timezone changed" notification carries no payload; handlers
//! re-read [`TimezoneSource::current`].

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Synchronous read of the current system timezone identifier.
pub trait TimezoneSource: Send + Sync {
    fn current(&self) -> Result<String, SourceError>;
}

/// Reads the OS timezone through `iana-time-zone`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimezoneSource;

impl TimezoneSource for SystemTimezoneSource {
    fn current(&self) -> Result<String, SourceError> {
        iana_time_zone::get_timezone().map_err(|err| SourceError::Unavailable(err.to_string()))
    }
}

/// Timezone lookup failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Unavailable(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "system timezone unavailable: {reason}"),
        }
    }
}

impl Error for SourceError {}
