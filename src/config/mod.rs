// src/config/mod.rs
//! Sensor wiring and acquisition configuration

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigLoader, LoadError};

use crate::acquisition::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete drop sensing configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SensorConfig {
    /// Subsystem open parameters
    #[serde(default)]
    pub board: BoardConfig,

    /// Continuous sampling parameters
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Sensors to configure, in channel configuration order
    #[serde(default = "defaults::sensors")]
    pub sensors: Vec<SensorSpec>,
}

/// Parameters used to open the analog subsystem
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// Pin/activation selector
    #[serde(default = "defaults::pin_selector")]
    pub pin_selector: u8,

    /// Subsystem mode flags
    #[serde(default = "defaults::mode_flags")]
    pub mode_flags: u8,
}

/// Continuous sampling parameters passed to the subsystem
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionConfig {
    /// Samples per acquisition cycle
    #[serde(default = "defaults::sample_rate")]
    pub sample_rate: u32,

    /// Sampling timer period in nanoseconds
    #[serde(default = "defaults::timer_period_ns")]
    pub timer_period_ns: u32,

    /// Clock divider / measurement mode selector
    #[serde(default = "defaults::clock_divider")]
    pub clock_divider: u32,

    /// Delay between polls in poll mode
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// One named drop sensor
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SensorSpec {
    /// Unique sensor name
    pub name: String,
    /// Analog input index
    pub channel: u8,
    /// Step slot sampling the input
    pub step: u8,
    /// Crossing that counts as a drop
    #[serde(default = "defaults::direction")]
    pub direction: Direction,
    /// Threshold magnitude in raw ADC counts
    pub threshold: u16,
}

mod defaults {
    use super::SensorSpec;
    use crate::acquisition::Direction;
    use crate::config::constants::*;

    pub fn pin_selector() -> u8 { board::DEFAULT_PIN_SELECTOR }
    pub fn mode_flags() -> u8 { board::DEFAULT_MODE_FLAGS }

    pub fn sample_rate() -> u32 { acquisition::DEFAULT_SAMPLE_RATE }
    pub fn timer_period_ns() -> u32 { acquisition::DEFAULT_TIMER_PERIOD_NS }
    pub fn clock_divider() -> u32 { acquisition::DEFAULT_CLOCK_DIVIDER }
    pub fn poll_interval_ms() -> u64 { acquisition::DEFAULT_POLL_INTERVAL_MS }

    pub fn direction() -> Direction { Direction::Falling }

    pub fn sensors() -> Vec<SensorSpec> {
        vec![
            SensorSpec {
                name: sensors::LEFT_NAME.to_string(),
                channel: sensors::LEFT_AIN,
                step: sensors::LEFT_STEP,
                direction: Direction::Falling,
                threshold: sensors::LEFT_THRESHOLD,
            },
            SensorSpec {
                name: sensors::RIGHT_NAME.to_string(),
                channel: sensors::RIGHT_AIN,
                step: sensors::RIGHT_STEP,
                direction: Direction::Falling,
                threshold: sensors::RIGHT_THRESHOLD,
            },
        ]
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            pin_selector: defaults::pin_selector(),
            mode_flags: defaults::mode_flags(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::sample_rate(),
            timer_period_ns: defaults::timer_period_ns(),
            clock_divider: defaults::clock_divider(),
            poll_interval_ms: defaults::poll_interval_ms(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            acquisition: AcquisitionConfig::default(),
            sensors: defaults::sensors(),
        }
    }
}

impl SensorConfig {
    /// Check wiring against hardware limits, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.sensors.is_empty() {
            errors.push("at least one sensor must be configured".to_string());
        }
        if self.sensors.len() > hardware::MAX_WAIT_TRIGGERS {
            errors.push(format!(
                "{} sensors configured, a single wait can watch at most {}",
                self.sensors.len(),
                hardware::MAX_WAIT_TRIGGERS
            ));
        }
        if self.acquisition.sample_rate == 0 {
            errors.push("sample_rate must be greater than 0".to_string());
        }

        let mut names = HashSet::new();
        let mut channels = HashSet::new();
        let mut steps = HashSet::new();
        for sensor in &self.sensors {
            if sensor.name.is_empty() {
                errors.push("sensor name cannot be empty".to_string());
            }
            if !names.insert(sensor.name.as_str()) {
                errors.push(format!("duplicate sensor name '{}'", sensor.name));
            }
            if sensor.channel >= hardware::MAX_ANALOG_INPUTS {
                errors.push(format!(
                    "sensor '{}': channel {} out of range (0..{})",
                    sensor.name, sensor.channel, hardware::MAX_ANALOG_INPUTS
                ));
            }
            if sensor.step > hardware::MAX_STEP {
                errors.push(format!(
                    "sensor '{}': step {} out of range (0..={})",
                    sensor.name, sensor.step, hardware::MAX_STEP
                ));
            }
            if !channels.insert(sensor.channel) {
                errors.push(format!("sensor '{}': channel {} already used", sensor.name, sensor.channel));
            }
            if !steps.insert(sensor.step) {
                errors.push(format!("sensor '{}': step {} already used", sensor.name, sensor.step));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `(channel, step)` bindings in sensor order
    pub fn bindings(&self) -> Vec<(u8, u8)> {
        self.sensors.iter().map(|s| (s.channel, s.step)).collect()
    }

    /// Look up a sensor by name
    pub fn sensor(&self, name: &str) -> Option<&SensorSpec> {
        self.sensors.iter().find(|s| s.name == name)
    }
}
