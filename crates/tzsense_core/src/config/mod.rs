//! Sensor configuration and the process-wide configuration store.
//!
//! # Responsibility
//! - Define the generic sensor configuration and its timezone
//!   specialization.
//! - Provide a replace-only store that readers can snapshot cheaply.
//!
//! # Invariants
//! - Readers always observe one complete configuration snapshot.
//! - A replace swaps the whole snapshot under the write lock; partially
//!   applied updates are never visible.
//! - The observer reference is non-owning; the store never keeps an observer
//!   alive.

mod store;

pub use store::ConfigStore;

use crate::sink::TimezoneObserver;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Weak};

/// Default database location used when no configuration overrides it.
pub const DEFAULT_DB_PATH: &str = "tzsense_timezone.sqlite3";

/// Storage engine selector forwarded to the storage collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbType {
    /// Bundled SQLite storage.
    #[default]
    Sqlite,
    /// No persistence; records are only observed and broadcast.
    None,
}

/// Generic sensor configuration shared by every sensor kind.
///
/// Serialized with camelCase keys; missing keys fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorConfig {
    pub enabled: bool,
    pub debug: bool,
    /// Free-form annotation copied onto new records.
    pub label: String,
    pub device_id: String,
    pub db_encryption_key: Option<String>,
    pub db_type: DbType,
    pub db_path: String,
    pub db_host: Option<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debug: false,
            label: String::new(),
            device_id: String::new(),
            db_encryption_key: None,
            db_type: DbType::default(),
            db_path: DEFAULT_DB_PATH.to_string(),
            db_host: None,
        }
    }
}

impl SensorConfig {
    /// Overwrites every base field from `other`.
    pub fn replace_with(&mut self, other: &SensorConfig) {
        self.clone_from(other);
    }

    /// Parses a serialized base configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::Deserialize`] for malformed JSON, for a JSON
    /// `null`, and for values of the wrong type.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::Deserialize)
    }
}

/// Timezone sensor configuration: the base layer plus the observer hook.
#[derive(Clone, Default)]
pub struct TimezoneConfig {
    pub sensor: SensorConfig,
    /// Non-owning reference to the live observer, if any.
    pub observer: Option<Weak<dyn TimezoneObserver>>,
}

impl TimezoneConfig {
    pub fn new(sensor: SensorConfig) -> Self {
        Self {
            sensor,
            observer: None,
        }
    }

    /// Attaches a non-owning observer reference.
    pub fn with_observer(mut self, observer: &Arc<dyn TimezoneObserver>) -> Self {
        self.observer = Some(Arc::downgrade(observer));
        self
    }

    /// Replaces base fields, then re-asserts the observer field.
    ///
    /// The observer is copied even when `other` has none, so replacing with
    /// an observer-less timezone config clears the current observer.
    pub fn replace_with(&mut self, other: &TimezoneConfig) {
        self.sensor.replace_with(&other.sensor);
        self.observer = other.observer.clone();
    }

    /// Replaces base fields only; the observer reference is kept.
    pub fn replace_sensor_with(&mut self, other: &SensorConfig) {
        self.sensor.replace_with(other);
    }

    /// Returns the observer when it is configured and still alive.
    pub fn live_observer(&self) -> Option<Arc<dyn TimezoneObserver>> {
        self.observer.as_ref().and_then(Weak::upgrade)
    }
}

impl Debug for TimezoneConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimezoneConfig")
            .field("sensor", &self.sensor)
            .field("observer_attached", &self.live_observer().is_some())
            .finish()
    }
}

/// Configuration replace/parse errors.
#[derive(Debug)]
pub enum ConfigError {
    Deserialize(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deserialize(err) => write!(f, "invalid serialized configuration: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Deserialize(err) => Some(err),
        }
    }
}
