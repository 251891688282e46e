//! Drop Watch CLI
//!
//! Watches the configured floor sensors on a simulated board, either
//! blocking until one of them drops or polling every sensor periodically.
//!
//! # Usage
//!
//! ```bash
//! # Block until the left sensor drops after 500 ms
//! drop-watch --simulate-drop left:500
//!
//! # Poll both sensors 20 times, printing JSON lines
//! drop-watch --mode poll --polls 20 --json
//!
//! # Use an explicit configuration file
//! drop-watch --config drop_sense.toml --timeout-ms 2000
//! ```
//!
//! Settings come from `drop_sense.toml` (or `--config`) layered with
//! `DROP_SENSE__*` environment variables. Exit code is 1 when the
//! configuration cannot be loaded or the session cannot be set up.

use clap::{Parser, ValueEnum};
use drop_sense::config::{ConfigLoader, SensorConfig};
use drop_sense::detection::DropDetector;
use drop_sense::error::{SenseError, WaitError};
use drop_sense::hal::simulator::{BackgroundProducer, DropProfile, SimulatedBoard, SimulatedSubsystem};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Drop Watch - detect floor drops on analog sensors
#[derive(Parser, Debug)]
#[command(name = "drop-watch")]
#[command(version)]
#[command(about = "Detect floor drops with threshold-triggered analog sensors", long_about = None)]
struct Args {
    /// Configuration file (defaults to drop_sense.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Block on triggers or poll the sample buffer
    #[arg(short, long, value_enum, default_value_t = Mode::Wait)]
    mode: Mode,

    /// Make a sensor's simulated reading drop after a delay
    #[arg(long, value_name = "SENSOR:MS", value_parser = parse_simulated_drop)]
    simulate_drop: Option<SimulatedDrop>,

    /// Number of polls in poll mode
    #[arg(long, default_value_t = 10)]
    polls: u32,

    /// Give up waiting after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Block until a sensor drops
    Wait,
    /// Periodically read every sensor
    Poll,
}

/// `--simulate-drop` argument
#[derive(Debug, Clone, PartialEq, Eq)]
struct SimulatedDrop {
    sensor: String,
    after: Duration,
}

fn parse_simulated_drop(value: &str) -> Result<SimulatedDrop, String> {
    let (sensor, delay) = value
        .split_once(':')
        .ok_or_else(|| format!("expected SENSOR:MS, got '{}'", value))?;
    let delay_ms = delay
        .parse::<u64>()
        .map_err(|e| format!("invalid delay '{}': {}", delay, e))?;
    Ok(SimulatedDrop {
        sensor: sensor.to_string(),
        after: Duration::from_millis(delay_ms),
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("drop_sense=info")),
        )
        .init();

    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Loading configuration failed");
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let board = SimulatedBoard::new();
    // Long poll runs would otherwise grow the call log without bound
    board.set_recording(false);
    let mut producer = match start_producer(&board, &config, args.simulate_drop.as_ref()) {
        Ok(producer) => producer,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(1);
        }
    };

    let code = match DropDetector::start(board.subsystem(), &config) {
        Ok(mut detector) => {
            let code = match args.mode {
                Mode::Wait => run_wait(&mut detector, &args),
                Mode::Poll => run_poll(&detector, &args, &config),
            };
            detector.close();
            code
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    };

    producer.stop();
    code
}

fn start_producer(
    board: &SimulatedBoard,
    config: &SensorConfig,
    simulated_drop: Option<&SimulatedDrop>,
) -> Result<BackgroundProducer, String> {
    let drop = match simulated_drop {
        Some(planned) => {
            let sensor = config
                .sensor(&planned.sensor)
                .ok_or_else(|| format!("unknown sensor '{}'", planned.sensor))?;
            Some((sensor.channel, planned.after))
        }
        None => None,
    };

    let inputs = config.sensors.iter().map(|s| s.channel).collect();
    let profile = DropProfile {
        drop,
        ..DropProfile::default()
    };
    // Let the floor level settle before the session arms its triggers
    let feed = board.feed();
    feed.set_samples(
        &config
            .sensors
            .iter()
            .map(|s| (s.channel, profile.floor_level))
            .collect::<Vec<_>>(),
    );
    Ok(BackgroundProducer::spawn(feed, inputs, profile))
}

fn run_wait(detector: &mut DropDetector<SimulatedSubsystem>, args: &Args) -> ExitCode {
    let timeout = args.timeout_ms.map(Duration::from_millis);
    match detector.wait_for_drop(timeout) {
        Ok(event) => {
            if args.json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => eprintln!("{}", e),
                }
            } else {
                for sensor in &event.sensors {
                    println!("Got drop: {}", sensor);
                }
            }
        }
        Err(SenseError::Wait(WaitError::TimedOut { .. })) => {
            info!("No drop before timeout");
            println!("No drop");
        }
        Err(e) => eprintln!("{}", e),
    }
    ExitCode::SUCCESS
}

fn run_poll(detector: &DropDetector<SimulatedSubsystem>, args: &Args, config: &SensorConfig) -> ExitCode {
    let interval = Duration::from_millis(config.acquisition.poll_interval_ms);
    for _ in 0..args.polls {
        match detector.poll() {
            Ok(readings) if args.json => match serde_json::to_string(&readings) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("{}", e),
            },
            Ok(readings) => {
                let line = readings
                    .iter()
                    .map(|r| format!("{}={}{}", r.name, r.value, if r.triggered { " (drop)" } else { "" }))
                    .collect::<Vec<_>>()
                    .join("  ");
                println!("{}", line);
            }
            Err(e) => eprintln!("{}", e),
        }
        thread::sleep(interval);
    }
    ExitCode::SUCCESS
}
