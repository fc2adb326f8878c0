//! Command-line host for the timezone sensor.
//!
//! # Responsibility
//! - Run the sensor against the OS timezone with SQLite history.
//! - Inspect stored history and the current system zone.
//!
//! # Invariants
//! - The observer printed by `run` stays alive for the whole session.
//! - `run` exits only on `quit` or a fatal startup error.

use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use std::error::Error;
use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use tzsense_core::db::open_db;
use tzsense_core::{
    default_log_level, init_logging, BroadcastReceiver, ChannelBroadcaster, ConfigStore, DbType,
    RecordListQuery, SensorConfig, Signal, SignalBus, SqliteTimezoneStorage,
    SystemTimezoneSource, TimezoneObserver, TimezoneRecord, TimezoneSensor, TimezoneSource,
    DEFAULT_DB_PATH,
};

const PUMP_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(
    name = "tzsense",
    version = env!("CARGO_PKG_VERSION"),
    about = "Records each change of the system timezone exactly once",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensor; control it with `label`, `sync`, `start`, `stop`, `quit` on stdin
    Run(RunArgs),

    /// Print stored timezone records
    History {
        #[arg(long = "db", default_value = DEFAULT_DB_PATH)]
        db_path: String,

        #[arg(long, help = "Only records not yet synced")]
        pending: bool,

        #[arg(long, help = "Maximum number of records to print")]
        limit: Option<u32>,

        #[arg(long, help = "Print records as JSON lines")]
        json: bool,
    },

    /// Print the current system timezone id
    Current,
}

#[derive(clap::Args)]
struct RunArgs {
    #[arg(long, default_value = "")]
    device_id: String,

    #[arg(long, default_value = "")]
    label: String,

    #[arg(long = "db", default_value = DEFAULT_DB_PATH)]
    db_path: String,

    #[arg(long, value_enum, default_value_t = StorageKind::Sqlite)]
    db_type: StorageKind,

    /// Serialized sensor configuration; replaces every flag above when given
    #[arg(long)]
    config: Option<String>,

    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,

    /// Absolute log directory (defaults to `<tmp>/tzsense-logs`)
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, help = "Enable verbose sensor diagnostics")]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageKind {
    Sqlite,
    None,
}

impl From<StorageKind> for DbType {
    fn from(value: StorageKind) -> Self {
        match value {
            StorageKind::Sqlite => DbType::Sqlite,
            StorageKind::None => DbType::None,
        }
    }
}

/// Stdin command accepted while `run` is active.
#[derive(Debug, PartialEq, Eq)]
enum Control {
    Publish(Signal),
    Quit,
}

struct PrintingObserver;

impl TimezoneObserver for PrintingObserver {
    fn on_timezone_changed(&self, record: &TimezoneRecord) {
        println!("observed {record}");
    }
}

fn main() {
    if let Err(err) = dispatch(Cli::parse()) {
        eprintln!("tzsense: {err}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::History {
            db_path,
            pending,
            limit,
            json,
        } => history(&db_path, pending, limit, json),
        Commands::Current => {
            println!("{}", SystemTimezoneSource.current()?);
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let log_dir = match &args.log_dir {
        Some(dir) => dir.clone(),
        None => std::env::temp_dir()
            .join("tzsense-logs")
            .to_string_lossy()
            .into_owned(),
    };
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, &log_dir)?;

    let store = ConfigStore::global();
    store.replace_sensor_with(&SensorConfig {
        enabled: true,
        debug: args.debug,
        label: args.label.clone(),
        device_id: args.device_id.clone(),
        db_type: args.db_type.into(),
        db_path: args.db_path.clone(),
        ..SensorConfig::default()
    });
    let observer: Arc<dyn TimezoneObserver> = Arc::new(PrintingObserver);
    store.set_observer(Some(&observer));

    let bus = Arc::new(SignalBus::new());
    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let mut broadcasts = broadcaster.subscribe();
    let mut sensor = TimezoneSensor::new(
        Arc::clone(&store),
        Arc::new(SystemTimezoneSource),
        Arc::clone(&bus),
    )
    .with_broadcaster(broadcaster);
    sensor.start(args.config.as_deref())?;
    info!(
        "event=cli_run module=cli status=ok poll_interval_secs={} log_dir={}",
        args.poll_interval_secs, log_dir
    );

    let quit = Arc::new(AtomicBool::new(false));
    spawn_poller(
        Arc::clone(&bus),
        Arc::clone(&quit),
        Duration::from_secs(args.poll_interval_secs.max(1)),
    );
    spawn_stdin_reader(Arc::clone(&bus), Arc::clone(&quit));

    while !quit.load(Ordering::SeqCst) {
        sensor.wait_and_pump(PUMP_INTERVAL);
        print_broadcasts(&mut broadcasts);
    }
    sensor.stop();
    print_broadcasts(&mut broadcasts);
    drop(observer);
    Ok(())
}

/// Re-publishes "timezone changed" on every tick; the sensor drops repeats.
fn spawn_poller(bus: Arc<SignalBus>, quit: Arc<AtomicBool>, interval: Duration) {
    thread::spawn(move || {
        while !quit.load(Ordering::SeqCst) {
            thread::sleep(interval);
            bus.publish(Signal::TimezoneChanged);
        }
    });
}

fn spawn_stdin_reader(bus: Arc<SignalBus>, quit: Arc<AtomicBool>) {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_control(&line) {
                Ok(Some(Control::Quit)) => {
                    quit.store(true, Ordering::SeqCst);
                    break;
                }
                Ok(Some(Control::Publish(signal))) => {
                    if bus.publish(signal) == 0 {
                        warn!("event=cli_command module=cli status=ignored reason=no_subscriber");
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            }
        }
    });
}

fn print_broadcasts(broadcasts: &mut BroadcastReceiver) {
    loop {
        let event = match broadcasts.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("event=cli_broadcast module=cli status=lagged skipped={skipped}");
                continue;
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return,
        };
        match serde_json::to_string(&event.payload) {
            Ok(payload) => println!("broadcast {} {payload}", event.name),
            Err(err) => warn!("event=cli_broadcast module=cli status=error error={err}"),
        }
    }
}

fn parse_control(line: &str) -> Result<Option<Control>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let control = match command {
        "label" => Control::Publish(Signal::SetLabel(rest.to_string())),
        "sync" => Control::Publish(Signal::Sync),
        "start" if rest.is_empty() => Control::Publish(Signal::Start(None)),
        "start" => Control::Publish(Signal::Start(Some(rest.to_string()))),
        "stop" => Control::Publish(Signal::Stop),
        "quit" | "exit" => Control::Quit,
        other => {
            return Err(format!(
                "unknown command `{other}`; expected label|sync|start|stop|quit"
            ))
        }
    };
    Ok(Some(control))
}

fn history(
    db_path: &str,
    pending: bool,
    limit: Option<u32>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let records = load_history(Path::new(db_path), pending, limit)?;
    for record in &records {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{record}");
        }
    }
    Ok(())
}

/// Reads stored records without creating a database at a mistyped path.
fn load_history(
    db_path: &Path,
    pending: bool,
    limit: Option<u32>,
) -> Result<Vec<TimezoneRecord>, Box<dyn Error>> {
    if !db_path.is_file() {
        return Err(format!("no timezone database at `{}`", db_path.display()).into());
    }
    let storage = SqliteTimezoneStorage::new(open_db(db_path)?);
    let records = storage.list_records(&RecordListQuery {
        pending_sync_only: pending,
        limit,
        ..RecordListQuery::default()
    })?;
    Ok(records)
}
