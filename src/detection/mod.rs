// src/detection/mod.rs
//! Drop detection across a set of named sensors
//!
//! [`DropDetector`] drives a whole session from a [`SensorConfig`]: it opens
//! the subsystem, configures every sensor's channel, arms one trigger per
//! sensor and then either blocks until a sensor drops or polls every sensor.
//! Init and configuration failures abort startup. A sensor whose trigger
//! cannot be armed is logged and left poll-only, so the others keep working.

use crate::acquisition::{AcquisitionSession, SessionState, TriggerHandle};
use crate::config::{LoadError, SensorConfig, SensorSpec};
use crate::error::{SenseResult, WaitError};
use crate::hal::AnalogSubsystem;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// A configured sensor and its trigger, if arming succeeded
#[derive(Debug, Clone)]
pub struct MonitoredSensor {
    /// Sensor wiring and threshold
    pub spec: SensorSpec,
    /// `None` when arming failed
    pub handle: Option<TriggerHandle>,
}

/// Sensors whose triggers fired, in firing order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropEvent {
    /// Names of the sensors that fired
    pub sensors: Vec<String>,
}

impl DropEvent {
    /// Whether sensor `name` fired
    pub fn includes(&self, name: &str) -> bool {
        self.sensors.iter().any(|s| s == name)
    }
}

/// Latest sample of one named sensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    /// Sensor name
    pub name: String,
    /// Analog input index
    pub channel: u8,
    /// Raw sample value
    pub value: u16,
    /// Sample currently satisfies the sensor's trigger condition
    pub triggered: bool,
}

/// Session wired up for a set of drop sensors
pub struct DropDetector<S: AnalogSubsystem> {
    session: AcquisitionSession<S>,
    sensors: Vec<MonitoredSensor>,
}

impl<S: AnalogSubsystem> DropDetector<S> {
    /// Open, configure and arm every sensor in `config`
    pub fn start(subsystem: S, config: &SensorConfig) -> SenseResult<Self> {
        config.validate().map_err(LoadError::ValidationError)?;

        let mut session = AcquisitionSession::with_acquisition(subsystem, config.acquisition);
        session.init(&config.board)?;
        session.configure_channels(&config.bindings())?;

        let mut sensors = Vec::with_capacity(config.sensors.len());
        for spec in &config.sensors {
            let handle = match session.arm_trigger(spec.channel, spec.direction, spec.threshold) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    warn!(sensor = %spec.name, error = %err, "Sensor left without trigger");
                    None
                }
            };
            sensors.push(MonitoredSensor {
                spec: spec.clone(),
                handle,
            });
        }

        info!(
            sensors = sensors.len(),
            armed = sensors.iter().filter(|s| s.handle.is_some()).count(),
            "Drop detector ready"
        );
        Ok(Self { session, sensors })
    }

    /// Block until at least one armed sensor drops
    pub fn wait_for_drop(&mut self, timeout: Option<Duration>) -> SenseResult<DropEvent> {
        let handles: Vec<TriggerHandle> = self.sensors.iter().filter_map(|s| s.handle).collect();
        if handles.is_empty() {
            return Err(WaitError::NoTriggers.into());
        }

        let fired = self.session.wait(&handles, timeout)?;
        let sensors = fired
            .iter()
            .filter_map(|handle| {
                self.sensors
                    .iter()
                    .find(|s| s.handle == Some(handle))
                    .map(|s| s.spec.name.clone())
            })
            .collect::<Vec<_>>();

        info!(sensors = ?sensors, "Got drop");
        Ok(DropEvent { sensors })
    }

    /// Latest reading of every sensor, in configuration order
    pub fn poll(&self) -> SenseResult<Vec<SensorReading>> {
        let readings = self.session.read_all()?;
        Ok(self
            .sensors
            .iter()
            .filter_map(|sensor| {
                let value = readings.get(sensor.spec.channel)?;
                let triggered = match sensor.handle.and_then(|h| self.session.trigger(h)) {
                    Some(trigger) => trigger.is_met_by(value),
                    None => sensor.spec.direction.is_crossed(sensor.spec.threshold, value),
                };
                Some(SensorReading {
                    name: sensor.spec.name.clone(),
                    channel: sensor.spec.channel,
                    value,
                    triggered,
                })
            })
            .collect())
    }

    /// Configured sensors with their trigger handles
    pub fn sensors(&self) -> &[MonitoredSensor] {
        &self.sensors
    }

    /// Names of sensors with an armed trigger
    pub fn armed_sensors(&self) -> impl Iterator<Item = &str> {
        self.sensors
            .iter()
            .filter(|s| s.handle.is_some())
            .map(|s| s.spec.name.as_str())
    }

    /// Underlying acquisition session
    pub fn session(&self) -> &AcquisitionSession<S> {
        &self.session
    }

    /// Lifecycle state of the underlying session
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Tear the session down now instead of on drop
    pub fn close(mut self) {
        self.session.close();
    }
}

/// One-shot drop wait: start a detector, block until a drop, tear down.
pub fn wait_for_drop<S: AnalogSubsystem>(
    subsystem: S,
    config: &SensorConfig,
    timeout: Option<Duration>,
) -> SenseResult<DropEvent> {
    let mut detector = DropDetector::start(subsystem, config)?;
    detector.wait_for_drop(timeout)
}
