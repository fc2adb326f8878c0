//! Timezone sensor lifecycle.
//!
//! # Responsibility
//! - Drive `Stopped -> Starting -> Running -> Stopping -> Stopped`.
//! - Route timezone-changed and control signals into the detector, the
//!   fan-out and the sync trigger.
//!
//! # Invariants
//! - Runtime signal handlers are registered at most once per running period.
//! - Domain and control signals are ignored unless the sensor is running.
//! - Everything runs on the thread that pumps the sensor inbox.

use crate::broadcast::ChannelBroadcaster;
use crate::config::{ConfigError, ConfigStore};
use crate::logging::sensor_debug;
use crate::repo::timezone_repo::SqliteStorageOpener;
use crate::repo::RepoResult;
use crate::service::change_detector::ChangeDetector;
use crate::service::fanout::{FanoutSinks, NotificationFanout, PublishReport};
use crate::service::record_factory::{Clock, RecordFactory, SystemClock};
use crate::service::sync_trigger::SyncTrigger;
use crate::signal::{Signal, SignalBus, SignalKind, SubscriptionId};
use crate::sink::{Broadcaster, StorageOpener, TimezoneStorage};
use crate::source::TimezoneSource;
use crate::sync::SyncSummary;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

/// Signals handled only while running.
const RUNTIME_SIGNALS: &[SignalKind] = &[
    SignalKind::TimezoneChanged,
    SignalKind::SetLabel,
    SignalKind::Sync,
];

/// Signals handled in every state.
const LIFECYCLE_SIGNALS: &[SignalKind] = &[
    SignalKind::Start,
    SignalKind::StartEnabled,
    SignalKind::Stop,
    SignalKind::StopAll,
];

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Errors surfaced to the caller of a sensor operation.
#[derive(Debug)]
pub enum SensorError {
    Config(ConfigError),
}

impl Display for SensorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SensorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
        }
    }
}

impl From<ConfigError> for SensorError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Timezone change sensor.
///
/// Lifecycle signals are subscribed on construction; runtime signals are
/// subscribed on start and dropped on stop. Signals queue in a private inbox
/// drained by [`TimezoneSensor::pump`] or [`TimezoneSensor::wait_and_pump`].
pub struct TimezoneSensor {
    config: Arc<ConfigStore>,
    source: Arc<dyn TimezoneSource>,
    storage_opener: Arc<dyn StorageOpener>,
    broadcaster: Arc<dyn Broadcaster>,
    bus: Arc<SignalBus>,
    factory: RecordFactory<Arc<dyn Clock>>,
    fanout: NotificationFanout,
    sync_trigger: SyncTrigger,
    detector: ChangeDetector,
    storage: Option<Box<dyn TimezoneStorage>>,
    state: SensorState,
    inbox_tx: Sender<Signal>,
    inbox: Receiver<Signal>,
    lifecycle_subscription: SubscriptionId,
    runtime_subscription: Option<SubscriptionId>,
}

impl TimezoneSensor {
    /// Creates a stopped sensor with SQLite storage, an in-process
    /// broadcaster and the system clock.
    pub fn new(
        config: Arc<ConfigStore>,
        source: Arc<dyn TimezoneSource>,
        bus: Arc<SignalBus>,
    ) -> Self {
        let (inbox_tx, inbox) = unbounded();
        let lifecycle_subscription = bus.subscribe(LIFECYCLE_SIGNALS, inbox_tx.clone());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            config,
            source,
            storage_opener: Arc::new(SqliteStorageOpener::new()),
            broadcaster: Arc::new(ChannelBroadcaster::new()),
            bus,
            factory: RecordFactory::with_clock(clock),
            fanout: NotificationFanout::new(),
            sync_trigger: SyncTrigger::new(),
            detector: ChangeDetector::new(),
            storage: None,
            state: SensorState::Stopped,
            inbox_tx,
            inbox,
            lifecycle_subscription,
            runtime_subscription: None,
        }
    }

    pub fn with_storage_opener(mut self, opener: Arc<dyn StorageOpener>) -> Self {
        self.storage_opener = opener;
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.factory = RecordFactory::with_clock(clock);
        self
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Last reported timezone id; empty while unknown.
    pub fn last_known_timezone(&self) -> &str {
        self.detector.last_known()
    }

    /// Starts the sensor, optionally applying a serialized configuration.
    ///
    /// While already running this does not re-register handlers; the payload
    /// is still applied and detection is retried if the zone is unknown.
    ///
    /// # Errors
    /// Returns [`SensorError::Config`] for a malformed payload; the sensor
    /// state is left unchanged.
    pub fn start(&mut self, payload: Option<&str>) -> Result<(), SensorError> {
        if let Some(json) = payload {
            self.config.replace_with_json(json)?;
        }

        if self.state != SensorState::Stopped {
            sensor_debug!(
                self.config.debug(),
                "event=sensor_start module=sensor status=skipped reason=already_running"
            );
            if self.detector.is_unknown() {
                self.check_timezone();
            }
            return Ok(());
        }

        self.state = SensorState::Starting;
        let config = self.config.snapshot();
        self.storage = match self.storage_opener.open(&config.sensor) {
            Ok(storage) => storage,
            Err(err) => {
                error!(
                    "event=sensor_start module=sensor status=error stage=storage_open error={}",
                    err
                );
                None
            }
        };
        self.runtime_subscription =
            Some(self.bus.subscribe(RUNTIME_SIGNALS, self.inbox_tx.clone()));
        sensor_debug!(
            config.sensor.debug,
            "event=sensor_start module=sensor status=created storage={}",
            self.storage.is_some()
        );

        if self.detector.is_unknown() {
            self.check_timezone();
        }

        self.state = SensorState::Running;
        info!("event=sensor_start module=sensor status=ok");
        Ok(())
    }

    /// Starts only when configuration has `enabled = true`.
    pub fn start_enabled(&mut self) -> Result<bool, SensorError> {
        let enabled = self.config.enabled();
        sensor_debug!(
            self.config.debug(),
            "event=sensor_start module=sensor status=check enabled={}",
            enabled
        );
        if !enabled {
            return Ok(false);
        }
        self.start(None)?;
        Ok(true)
    }

    /// Stops the sensor: unregisters runtime handlers and closes storage.
    ///
    /// The detector is reset, so the next start reports the zone again.
    pub fn stop(&mut self) {
        if self.state != SensorState::Running {
            return;
        }
        self.state = SensorState::Stopping;

        if let Some(id) = self.runtime_subscription.take() {
            self.bus.unsubscribe(id);
        }
        if let Some(storage) = self.storage.take() {
            if let Err(err) = storage.close() {
                error!(
                    "event=sensor_stop module=sensor status=error stage=storage_close error={}",
                    err
                );
            }
        }
        self.detector = ChangeDetector::new();

        self.state = SensorState::Stopped;
        info!("event=sensor_stop module=sensor status=ok");
    }

    /// Re-reads the system timezone and publishes it when novel.
    ///
    /// Returns the publish report, or `None` when nothing was published.
    pub fn check_timezone(&mut self) -> Option<PublishReport> {
        let current = match self.source.current() {
            Ok(current) => current,
            Err(err) => {
                warn!(
                    "event=timezone_check module=sensor status=error error={}",
                    err
                );
                return None;
            }
        };

        // A blank reading would clear the last known zone.
        if current.trim().is_empty() {
            warn!("event=timezone_check module=sensor status=skipped reason=blank_timezone_id");
            return None;
        }

        let timezone_id = self.detector.check_and_update(&current)?;
        let config = self.config.snapshot();
        let record = self.factory.build(&timezone_id, &config.sensor);
        let sinks = FanoutSinks {
            storage: self.storage.as_deref(),
            broadcaster: &*self.broadcaster,
        };
        Some(self.fanout.publish(&record, &config, &sinks))
    }

    /// Forwards a sync request to storage.
    pub fn sync(&self) -> Option<RepoResult<SyncSummary>> {
        self.sync_trigger.sync(self.storage.as_deref())
    }

    /// Handles one signal according to the current state.
    pub fn dispatch(&mut self, signal: Signal) -> Result<(), SensorError> {
        sensor_debug!(
            self.config.debug(),
            "event=signal_received module=sensor kind={:?} state={:?}",
            signal.kind(),
            self.state
        );

        match signal {
            Signal::Start(payload) => self.start(payload.as_deref()),
            Signal::StartEnabled => self.start_enabled().map(|_| ()),
            Signal::Stop | Signal::StopAll => {
                self.stop();
                Ok(())
            }
            _ if self.state != SensorState::Running => {
                sensor_debug!(
                    self.config.debug(),
                    "event=signal_received module=sensor status=ignored reason=not_running"
                );
                Ok(())
            }
            Signal::TimezoneChanged => {
                self.check_timezone();
                Ok(())
            }
            Signal::SetLabel(label) => {
                self.config.set_label(label);
                Ok(())
            }
            Signal::Sync => {
                self.sync();
                Ok(())
            }
        }
    }

    /// Dispatches every queued signal; returns how many were handled.
    ///
    /// Dispatch errors are logged and do not stop the drain.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.inbox.try_recv() {
            self.dispatch_logged(signal);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for a signal, then drains the inbox.
    pub fn wait_and_pump(&mut self, timeout: Duration) -> usize {
        match self.inbox.recv_timeout(timeout) {
            Ok(signal) => {
                self.dispatch_logged(signal);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn dispatch_logged(&mut self, signal: Signal) {
        let kind = signal.kind();
        if let Err(err) = self.dispatch(signal) {
            error!(
                "event=signal_dispatch module=sensor status=error kind={:?} error={}",
                kind, err
            );
        }
    }
}

impl Drop for TimezoneSensor {
    fn drop(&mut self) {
        self.stop();
        self.bus.unsubscribe(self.lifecycle_subscription);
    }
}
