#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tzsense_core::{
    BroadcastError, BroadcastPayload, Broadcaster, Clock, RepoError, RepoResult, SensorConfig,
    SourceError, StorageOpener, SyncSummary, TimezoneObserver, TimezoneRecord, TimezoneSource,
    TimezoneStorage,
};

/// Shared, ordered log of sink calls across all doubles.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn clear(log: &CallLog) {
    log.lock().unwrap().clear();
}

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.0
    }
}

/// Timezone source whose answer the test controls.
#[derive(Default)]
pub struct ScriptedSource {
    current: Mutex<Option<String>>,
}

impl ScriptedSource {
    pub fn new(zone: &str) -> Self {
        Self {
            current: Mutex::new(Some(zone.to_string())),
        }
    }

    pub fn set(&self, zone: &str) {
        *self.current.lock().unwrap() = Some(zone.to_string());
    }

    pub fn fail(&self) {
        *self.current.lock().unwrap() = None;
    }
}

impl TimezoneSource for ScriptedSource {
    fn current(&self) -> Result<String, SourceError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SourceError::Unavailable("scripted failure".to_string()))
    }
}

pub struct RecordingStorage {
    log: CallLog,
    saved: Arc<Mutex<Vec<TimezoneRecord>>>,
    fail_saves: bool,
}

impl RecordingStorage {
    pub fn new(log: CallLog, fail_saves: bool) -> Self {
        Self {
            log,
            saved: Arc::new(Mutex::new(Vec::new())),
            fail_saves,
        }
    }

    pub fn saved(&self) -> Vec<TimezoneRecord> {
        self.saved.lock().unwrap().clone()
    }
}

impl TimezoneStorage for RecordingStorage {
    fn save(&self, record: &TimezoneRecord, table: &str) -> RepoResult<()> {
        if self.fail_saves {
            self.log.lock().unwrap().push("storage:fail".to_string());
            return Err(RepoError::InvalidData("injected storage failure".to_string()));
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("storage:{table}:{}", record.timezone_id()));
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn start_sync(&self, table: &str) -> RepoResult<SyncSummary> {
        self.log.lock().unwrap().push(format!("sync:{table}"));
        Ok(SyncSummary {
            pending: self.saved.lock().unwrap().len(),
            synced: 0,
        })
    }

    fn close(self: Box<Self>) -> RepoResult<()> {
        self.log.lock().unwrap().push("close".to_string());
        Ok(())
    }
}

/// Opener handing out [`RecordingStorage`] that share one saved-record list.
pub struct RecordingOpener {
    log: CallLog,
    saved: Arc<Mutex<Vec<TimezoneRecord>>>,
    fail_saves: bool,
    opens: AtomicUsize,
}

impl RecordingOpener {
    pub fn new(log: CallLog, fail_saves: bool) -> Self {
        Self {
            log,
            saved: Arc::new(Mutex::new(Vec::new())),
            fail_saves,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<TimezoneRecord> {
        self.saved.lock().unwrap().clone()
    }
}

impl StorageOpener for RecordingOpener {
    fn open(&self, _config: &SensorConfig) -> RepoResult<Option<Box<dyn TimezoneStorage>>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Box::new(RecordingStorage {
            log: Arc::clone(&self.log),
            saved: Arc::clone(&self.saved),
            fail_saves: self.fail_saves,
        })))
    }
}

pub struct RecordingObserver {
    log: CallLog,
    records: Mutex<Vec<TimezoneRecord>>,
}

impl RecordingObserver {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<TimezoneRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl TimezoneObserver for RecordingObserver {
    fn on_timezone_changed(&self, record: &TimezoneRecord) {
        self.log
            .lock()
            .unwrap()
            .push(format!("observer:{}", record.timezone_id()));
        self.records.lock().unwrap().push(record.clone());
    }
}

pub struct PanickingObserver;

impl TimezoneObserver for PanickingObserver {
    fn on_timezone_changed(&self, _record: &TimezoneRecord) {
        panic!("observer exploded");
    }
}

/// Storage whose `save` panics after logging the attempt.
pub struct PanickingStorage {
    log: CallLog,
}

impl PanickingStorage {
    pub fn new(log: CallLog) -> Self {
        Self { log }
    }
}

impl TimezoneStorage for PanickingStorage {
    fn save(&self, _record: &TimezoneRecord, _table: &str) -> RepoResult<()> {
        self.log.lock().unwrap().push("storage:panic".to_string());
        panic!("storage exploded");
    }

    fn start_sync(&self, _table: &str) -> RepoResult<SyncSummary> {
        Ok(SyncSummary::default())
    }

    fn close(self: Box<Self>) -> RepoResult<()> {
        Ok(())
    }
}

pub struct PanickingBroadcaster;

impl Broadcaster for PanickingBroadcaster {
    fn emit(&self, _event_name: &str, _payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        panic!("broadcaster exploded");
    }
}

pub struct RecordingBroadcaster {
    log: CallLog,
    events: Mutex<Vec<(String, BroadcastPayload)>>,
    fail: bool,
}

impl RecordingBroadcaster {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            events: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            fail: true,
            ..Self::new(log)
        }
    }

    pub fn events(&self) -> Vec<(String, BroadcastPayload)> {
        self.events.lock().unwrap().clone()
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn emit(&self, event_name: &str, payload: &BroadcastPayload) -> Result<(), BroadcastError> {
        if self.fail {
            self.log.lock().unwrap().push("broadcast:fail".to_string());
            return Err(BroadcastError::Closed);
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("broadcast:{}", payload.timezone_id));
        self.events
            .lock()
            .unwrap()
            .push((event_name.to_string(), payload.clone()));
        Ok(())
    }
}
