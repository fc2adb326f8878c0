//! Replace-only configuration store.

use super::{ConfigError, SensorConfig, TimezoneConfig};
use crate::sink::TimezoneObserver;
use log::{error, info};
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

static GLOBAL_STORE: Lazy<Arc<ConfigStore>> = Lazy::new(|| Arc::new(ConfigStore::default()));

/// Holds the active [`TimezoneConfig`] snapshot.
///
/// Writers hold the write lock for the whole replace; readers only clone
/// the current `Arc`.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<Arc<TimezoneConfig>>,
}

impl ConfigStore {
    pub fn new(initial: TimezoneConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Returns the process-wide store.
    pub fn global() -> Arc<ConfigStore> {
        Arc::clone(&GLOBAL_STORE)
    }

    /// Returns the current whole-configuration snapshot.
    pub fn snapshot(&self) -> Arc<TimezoneConfig> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn enabled(&self) -> bool {
        self.snapshot().sensor.enabled
    }

    pub fn debug(&self) -> bool {
        self.snapshot().sensor.debug
    }

    pub fn label(&self) -> String {
        self.snapshot().sensor.label.clone()
    }

    pub fn device_id(&self) -> String {
        self.snapshot().sensor.device_id.clone()
    }

    /// Replaces the configuration through the timezone layer.
    ///
    /// See [`TimezoneConfig::replace_with`] for the observer rule.
    pub fn replace_with(&self, config: &TimezoneConfig) {
        self.update(|current| current.replace_with(config));
    }

    /// Replaces base fields only, keeping the current observer.
    pub fn replace_sensor_with(&self, config: &SensorConfig) {
        self.update(|current| current.replace_sensor_with(config));
    }

    /// Parses a serialized base configuration and applies it.
    ///
    /// A serialized payload cannot carry an observer, so the current observer
    /// is kept.
    ///
    /// # Errors
    /// Returns [`ConfigError::Deserialize`] and leaves the store unchanged
    /// when the payload cannot be parsed.
    pub fn replace_with_json(&self, json: &str) -> Result<(), ConfigError> {
        let parsed = match SensorConfig::from_json(json) {
            Ok(parsed) => parsed,
            Err(err) => {
                error!(
                    "event=config_replace module=config status=error source=json error={}",
                    err
                );
                return Err(err);
            }
        };
        self.replace_sensor_with(&parsed);
        info!("event=config_replace module=config status=ok source=json");
        Ok(())
    }

    pub fn set_label(&self, label: impl Into<String>) {
        let label = label.into();
        self.update(|current| current.sensor.label = label);
    }

    pub fn set_observer(&self, observer: Option<&Arc<dyn TimezoneObserver>>) {
        let observer = observer.map(Arc::downgrade);
        self.update(|current| current.observer = observer);
    }

    fn update(&self, apply: impl FnOnce(&mut TimezoneConfig)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = TimezoneConfig::clone(&guard);
        apply(&mut next);
        *guard = Arc::new(next);
    }
}
