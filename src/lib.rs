//! Drop-Sense: threshold-triggered drop detection on an ADC coprocessor
//!
//! This library binds analog floor sensors to an ADC subsystem that samples
//! continuously in the background, and reports when a sensor's reading
//! crosses a threshold. It features:
//!
//! - Capability interface to the analog subsystem, with a simulated board
//! - Exclusive acquisition sessions with deterministic teardown
//! - Hardware threshold triggers with blocking, multi-trigger waits
//! - Non-blocking reads of the live sample buffer
//! - Layered file and environment configuration
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use drop_sense::acquisition::{AcquisitionSession, Direction};
//! use drop_sense::config::BoardConfig;
//! use drop_sense::hal::simulator::SimulatedBoard;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), drop_sense::SenseError> {
//!     let board = SimulatedBoard::new();
//!     let mut session = AcquisitionSession::open(board.subsystem(), &BoardConfig::default())?;
//!
//!     session.configure_channels(&[(1, 11)])?;
//!     let handle = session.arm_trigger(1, Direction::Falling, 15_000)?;
//!
//!     let fired = session.wait(&[handle], Some(Duration::from_secs(1)))?;
//!     println!("fired: {}", fired.contains(handle));
//!     println!("AIN1 = {}", session.read_latest(1)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod detection;
pub mod error;
pub mod hal;

// Re-export commonly used types for convenience
pub use acquisition::{
    AcquisitionSession, ChannelMask, Direction, FiredSet, Readings, SensorChannel, SessionState,
    TriggerHandle,
};
pub use config::{ConfigLoader, SensorConfig};
pub use detection::{DropDetector, DropEvent, SensorReading};
pub use error::{ErrorKind, SenseError, SenseResult};
pub use hal::AnalogSubsystem;
