mod common;

use common::{
    call_log, calls, PanickingBroadcaster, PanickingObserver, PanickingStorage,
    RecordingBroadcaster, RecordingObserver, RecordingStorage,
};
use std::sync::Arc;
use tzsense_core::{
    FanoutSinks, NotificationFanout, SensorConfig, SinkOutcome, TimezoneConfig, TimezoneObserver,
    TimezoneRecord,
};

fn config_with(observer: &Arc<dyn TimezoneObserver>) -> TimezoneConfig {
    TimezoneConfig::new(SensorConfig::default()).with_observer(observer)
}

#[test]
fn delivers_in_storage_observer_broadcast_order() {
    let log = call_log();
    let storage = RecordingStorage::new(Arc::clone(&log), false);
    let observer: Arc<dyn TimezoneObserver> = Arc::new(RecordingObserver::new(Arc::clone(&log)));
    let broadcaster = RecordingBroadcaster::new(Arc::clone(&log));
    let record = TimezoneRecord::new("Europe/Oslo", 10, "dev-1", "");

    let report = NotificationFanout::new().publish(
        &record,
        &config_with(&observer),
        &FanoutSinks {
            storage: Some(&storage),
            broadcaster: &broadcaster,
        },
    );

    assert!(report.all_delivered());
    assert_eq!(
        calls(&log),
        vec![
            "storage:timezoneData:Europe/Oslo".to_string(),
            "observer:Europe/Oslo".to_string(),
            "broadcast:Europe/Oslo".to_string(),
        ]
    );
    assert_eq!(storage.saved(), vec![record]);
}

#[test]
fn failures_are_reported_per_sink_and_do_not_abort_later_sinks() {
    let log = call_log();
    let storage = RecordingStorage::new(Arc::clone(&log), true);
    let observer: Arc<dyn TimezoneObserver> = Arc::new(PanickingObserver);
    let broadcaster = RecordingBroadcaster::failing(Arc::clone(&log));
    let record = TimezoneRecord::new("UTC", 10, "", "");

    let report = NotificationFanout::new().publish(
        &record,
        &config_with(&observer),
        &FanoutSinks {
            storage: Some(&storage),
            broadcaster: &broadcaster,
        },
    );

    assert!(matches!(report.storage, SinkOutcome::Failed(_)));
    assert!(matches!(report.observer, SinkOutcome::Failed(_)));
    assert!(matches!(report.broadcast, SinkOutcome::Failed(_)));
    assert_eq!(
        calls(&log),
        vec!["storage:fail".to_string(), "broadcast:fail".to_string()]
    );
}

#[test]
fn missing_storage_and_observer_are_skipped() {
    let log = call_log();
    let broadcaster = RecordingBroadcaster::new(Arc::clone(&log));
    let record = TimezoneRecord::new("UTC", 10, "", "");

    let report = NotificationFanout::new().publish(
        &record,
        &TimezoneConfig::default(),
        &FanoutSinks {
            storage: None,
            broadcaster: &broadcaster,
        },
    );

    assert_eq!(report.storage, SinkOutcome::Skipped);
    assert_eq!(report.observer, SinkOutcome::Skipped);
    assert_eq!(report.broadcast, SinkOutcome::Delivered);
    assert_eq!(calls(&log), vec!["broadcast:UTC".to_string()]);
}

#[test]
fn publish_does_not_deduplicate() {
    let log = call_log();
    let storage = RecordingStorage::new(Arc::clone(&log), false);
    let broadcaster = RecordingBroadcaster::new(Arc::clone(&log));
    let record = TimezoneRecord::new("UTC", 10, "", "");
    let sinks = FanoutSinks {
        storage: Some(&storage),
        broadcaster: &broadcaster,
    };
    let fanout = NotificationFanout::new();

    fanout.publish(&record, &TimezoneConfig::default(), &sinks);
    fanout.publish(&record, &TimezoneConfig::default(), &sinks);

    assert_eq!(storage.saved().len(), 2);
    assert_eq!(broadcaster.events().len(), 2);
}

#[test]
fn panicking_storage_does_not_block_observer_or_broadcast() {
    let log = call_log();
    let storage = PanickingStorage::new(Arc::clone(&log));
    let observer: Arc<dyn TimezoneObserver> = Arc::new(RecordingObserver::new(Arc::clone(&log)));
    let broadcaster = RecordingBroadcaster::new(Arc::clone(&log));
    let record = TimezoneRecord::new("America/Lima", 10, "dev-1", "");

    let report = NotificationFanout::new().publish(
        &record,
        &config_with(&observer),
        &FanoutSinks {
            storage: Some(&storage),
            broadcaster: &broadcaster,
        },
    );

    assert_eq!(
        report.storage,
        SinkOutcome::Failed("storage panicked".to_string())
    );
    assert_eq!(report.observer, SinkOutcome::Delivered);
    assert_eq!(report.broadcast, SinkOutcome::Delivered);
    assert_eq!(
        calls(&log),
        vec![
            "storage:panic".to_string(),
            "observer:America/Lima".to_string(),
            "broadcast:America/Lima".to_string(),
        ]
    );
}

#[test]
fn panicking_broadcaster_is_reported_as_failed() {
    let log = call_log();
    let storage = RecordingStorage::new(Arc::clone(&log), false);
    let observer: Arc<dyn TimezoneObserver> = Arc::new(RecordingObserver::new(Arc::clone(&log)));
    let record = TimezoneRecord::new("UTC", 10, "", "");

    let report = NotificationFanout::new().publish(
        &record,
        &config_with(&observer),
        &FanoutSinks {
            storage: Some(&storage),
            broadcaster: &PanickingBroadcaster,
        },
    );

    assert_eq!(report.storage, SinkOutcome::Delivered);
    assert_eq!(report.observer, SinkOutcome::Delivered);
    assert_eq!(
        report.broadcast,
        SinkOutcome::Failed("broadcast panicked".to_string())
    );
    assert_eq!(
        calls(&log),
        vec![
            "storage:timezoneData:UTC".to_string(),
            "observer:UTC".to_string(),
        ]
    );
}
