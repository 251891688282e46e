// tests/session_lifecycle.rs
//! End-to-end acquisition session tests against the simulated board
//!
//! Covers the full open/configure/arm/wait/read/close cycle, the
//! lifecycle rules around failed initialization, and exclusivity of the
//! analog subsystem.

use drop_sense::acquisition::{AcquisitionSession, Direction, SessionState};
use drop_sense::config::BoardConfig;
use drop_sense::error::{ErrorKind, InitError, SenseError, WaitError};
use drop_sense::hal::simulator::{
    BackgroundProducer, DropProfile, Fault, SimulatedBoard, SubsystemCall,
};
use std::thread;
use std::time::{Duration, Instant};

fn close_calls(board: &SimulatedBoard) -> usize {
    board.calls().iter().filter(|c| **c == SubsystemCall::Close).count()
}

/// Single sensor trigger: a producer drops AIN1 below 15000 while the
/// session is blocked in wait.
#[test]
fn test_single_sensor_trigger() {
    let board = SimulatedBoard::new();
    let feed = board.feed();
    feed.set_sample(1, 30_000);

    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default())
        .expect("Failed to open session");
    session.configure_channels(&[(1, 11)]).expect("Failed to configure");
    let handle = session
        .arm_trigger(1, Direction::Falling, 15_000)
        .expect("Failed to arm");
    assert_eq!(session.state(), SessionState::Armed);

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        feed.set_sample(1, 10_000);
    });

    let started = Instant::now();
    let fired = session
        .wait(&[handle], Some(Duration::from_secs(5)))
        .expect("Wait failed");
    producer.join().unwrap();

    assert!(fired.contains(handle));
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert!(session.read_latest(1).unwrap() < 15_000);

    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!board.is_claimed());
}

/// Dual sensor polling with a background producer refreshing both inputs
#[test]
fn test_dual_sensor_polling() {
    let board = SimulatedBoard::new();
    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
    session.configure_channels(&[(1, 11), (2, 12)]).unwrap();
    assert_eq!(session.channel_mask().bits(), 0b1100);

    let mut producer = BackgroundProducer::spawn(
        board.feed(),
        vec![1, 2],
        DropProfile {
            drop: Some((2, Duration::from_millis(30))),
            ..DropProfile::default()
        },
    );
    thread::sleep(Duration::from_millis(100));

    let readings = session.read_all().unwrap();
    producer.stop();

    let left = readings.get(1).unwrap();
    let right = readings.get(2).unwrap();
    assert!(left > 30_000, "left still on the floor: {}", left);
    assert!(right < 15_000, "right dropped: {}", right);

    // Reads never change state
    assert_eq!(session.state(), SessionState::Configured);
}

#[test]
fn test_wait_returns_only_fired_subset() {
    let board = SimulatedBoard::new();
    let feed = board.feed();
    feed.set_samples(&[(1, 30_000), (2, 30_000)]);

    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
    session.configure_channels(&[(1, 11), (2, 12)]).unwrap();
    let left = session.arm_trigger(1, Direction::Falling, 15_000).unwrap();
    let right = session.arm_trigger(2, Direction::Falling, 15_000).unwrap();

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        feed.set_sample(2, 5_000);
    });
    let fired = session.wait(&[left, right], Some(Duration::from_secs(5))).unwrap();
    producer.join().unwrap();

    assert!(fired.contains(right));
    assert!(!fired.contains(left));
    assert_eq!(fired.len(), 1);
}

#[test]
fn test_timeout_leaves_session_armed() {
    let board = SimulatedBoard::new();
    board.feed().set_sample(1, 30_000);

    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
    session.configure_channels(&[(1, 11)]).unwrap();
    let handle = session.arm_trigger(1, Direction::Falling, 15_000).unwrap();

    let err = session.wait(&[handle], Some(Duration::from_millis(30))).unwrap_err();
    assert!(matches!(err, WaitError::TimedOut { .. }));
    assert_eq!(session.state(), SessionState::Armed);

    // The trigger is still usable
    board.feed().set_sample(1, 1_000);
    assert!(session.wait(&[handle], Some(Duration::from_millis(30))).unwrap().contains(handle));
}

#[test]
fn test_close_after_failed_init_releases_once() {
    let board = SimulatedBoard::new();
    board.inject_fault(Fault::Open, "no such device");

    let mut session = AcquisitionSession::new(board.subsystem());
    let err: SenseError = session.init(&BoardConfig::default()).unwrap_err().into();
    assert_eq!(err.kind(), ErrorKind::Init);
    assert_eq!(err.diagnostic(), Some("no such device"));

    session.close();
    session.close();
    drop(session);

    assert_eq!(close_calls(&board), 1);
}

#[test]
fn test_scoped_open_failure_tears_down() {
    let board = SimulatedBoard::new();
    board.inject_fault(Fault::Open, "permission denied");

    let result = AcquisitionSession::open(board.subsystem(), &BoardConfig::default());
    assert!(matches!(result, Err(InitError::OpenFailed { .. })));
    assert_eq!(close_calls(&board), 1);
}

#[test]
fn test_second_session_is_refused_until_first_closes() {
    let board = SimulatedBoard::new();
    let mut first = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();

    let mut second = AcquisitionSession::new(board.subsystem());
    let err = second.init(&BoardConfig::default()).unwrap_err();
    assert!(err.to_string().contains("busy"));
    assert_eq!(second.state(), SessionState::Error);

    first.close();
    second.init(&BoardConfig::default()).unwrap();
    assert_eq!(second.state(), SessionState::Configured);
}

#[test]
fn test_sequential_sessions_reuse_board() {
    let board = SimulatedBoard::new();

    for round in 0..3u16 {
        let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
        session.configure_channels(&[(1, 11)]).unwrap();
        board.feed().set_sample(1, 1_000 + round);
        assert_eq!(session.read_latest(1).unwrap(), 1_000 + round);
    }

    assert!(!board.is_claimed());
    assert_eq!(close_calls(&board), 3);
}

#[test]
fn test_reconfigure_discards_triggers() {
    let board = SimulatedBoard::new();
    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
    session.configure_channels(&[(1, 11)]).unwrap();
    let old = session.arm_trigger(1, Direction::Falling, 15_000).unwrap();

    session.configure_channels(&[(1, 11), (2, 12)]).unwrap();
    assert_eq!(session.state(), SessionState::Configured);
    assert!(session.triggers().is_empty());
    assert!(session.trigger(old).is_none());
    assert_eq!(board.armed_triggers(), 0);
}

/// Repeated reads of one input on one session see each newly published sample
#[test]
fn test_consecutive_reads_follow_live_samples() {
    let board = SimulatedBoard::new();
    let feed = board.feed();
    let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default()).unwrap();
    session.configure_channels(&[(1, 11), (2, 12)]).unwrap();

    feed.set_sample(1, 30_000);
    let first = session.read_latest(1);
    thread::sleep(Duration::from_millis(10));
    feed.set_sample(1, 12_000);
    let second = session.read_latest(1);

    assert_eq!(first.unwrap(), 30_000);
    assert_eq!(second.unwrap(), 12_000);
    assert_eq!(session.state(), SessionState::Configured);
    assert_eq!(session.last_error(), None);
}
