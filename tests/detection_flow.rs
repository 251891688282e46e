// tests/detection_flow.rs
//! Drop detection driven from a configuration file

use drop_sense::config::ConfigLoader;
use drop_sense::detection::{wait_for_drop, DropDetector};
use drop_sense::error::{ErrorKind, SenseError, WaitError};
use drop_sense::hal::simulator::{BackgroundProducer, DropProfile, SimulatedBoard};
use serial_test::serial;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const WIRING: &str = r#"
[board]
pin_selector = 0x98
mode_flags = 1

[acquisition]
sample_rate = 10
poll_interval_ms = 5

[[sensors]]
name = "left"
channel = 1
step = 11
threshold = 25000

[[sensors]]
name = "right"
channel = 2
step = 12
threshold = 25000
"#;

fn wiring_file() -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(WIRING.as_bytes()).unwrap();
    file
}

#[test]
#[serial]
fn test_config_file_to_drop_event() {
    let file = wiring_file();
    let config = ConfigLoader::with_path(file.path()).without_environment().load().unwrap();
    assert_eq!(config.acquisition.poll_interval_ms, 5);

    let board = SimulatedBoard::new();
    board.feed().set_samples(&[(1, 40_000), (2, 40_000)]);
    let _producer = BackgroundProducer::spawn(
        board.feed(),
        vec![1, 2],
        DropProfile {
            drop: Some((1, Duration::from_millis(40))),
            ..DropProfile::default()
        },
    );

    let event = wait_for_drop(board.subsystem(), &config, Some(Duration::from_secs(5))).unwrap();
    assert_eq!(event.sensors, vec!["left".to_string()]);
    assert!(!board.is_claimed());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = wiring_file();

    std::env::set_var("DROP_SENSE__ACQUISITION__POLL_INTERVAL_MS", "7");
    let loaded = ConfigLoader::with_path(file.path()).load();
    std::env::remove_var("DROP_SENSE__ACQUISITION__POLL_INTERVAL_MS");
    assert_eq!(loaded.unwrap().acquisition.poll_interval_ms, 7);

    std::env::set_var("DROP_SENSE__ACQUISITION__SAMPLE_RATE", "0");
    let loaded = ConfigLoader::with_path(file.path()).load();
    std::env::remove_var("DROP_SENSE__ACQUISITION__SAMPLE_RATE");
    let err = loaded.unwrap_err();
    assert!(err.to_string().contains("sample_rate"));

    let settings: SenseError = err.into();
    assert_eq!(settings.kind(), ErrorKind::Settings);
    assert!(settings.is_fatal());
}

#[test]
#[serial]
fn test_poll_and_wait_on_same_detector() {
    let file = wiring_file();
    let config = ConfigLoader::from_file(file.path()).unwrap();

    let board = SimulatedBoard::new();
    board.feed().set_samples(&[(1, 40_000), (2, 40_000)]);
    let mut detector = DropDetector::start(board.subsystem(), &config).unwrap();

    let readings = detector.poll().unwrap();
    assert!(readings.iter().all(|r| !r.triggered));

    let err = detector.wait_for_drop(Some(Duration::from_millis(20))).unwrap_err();
    assert!(matches!(err, SenseError::Wait(WaitError::TimedOut { .. })));
    assert!(err.is_recoverable());

    board.feed().set_sample(2, 3_000);
    let readings = detector.poll().unwrap();
    assert!(readings.iter().any(|r| r.name == "right" && r.triggered));

    let event = detector.wait_for_drop(Some(Duration::from_millis(200))).unwrap();
    assert!(event.includes("right"));

    detector.close();
    assert!(!board.is_claimed());
}
