// src/acquisition/session.rs
//! Exclusive acquisition session against the analog subsystem
//!
//! An [`AcquisitionSession`] owns the subsystem value for its whole
//! lifetime. It validates requests locally before they reach the hardware,
//! keeps the channel and trigger bookkeeping the hardware does not expose,
//! and releases the subsystem exactly once, either through
//! [`close`](AcquisitionSession::close) or when dropped.

use crate::acquisition::channels::{build_channels, ChannelMask, SensorChannel};
use crate::acquisition::state::SessionState;
use crate::acquisition::trigger::{Direction, FiredSet, TriggerHandle, TriggerSpec};
use crate::config::constants::hardware::MAX_WAIT_TRIGGERS;
use crate::config::{AcquisitionConfig, BoardConfig};
use crate::error::{ArmError, ArmErrorKind, ConfigError, ConfigErrorKind, InitError, ReadError, WaitError};
use crate::hal::{AcquisitionParams, AnalogSubsystem};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Latest sample of one configured channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reading {
    /// Channel the sample came from
    pub channel: SensorChannel,
    /// Raw sample value
    pub value: u16,
}

/// Latest samples of every configured channel, in configuration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Readings {
    /// One reading per configured channel
    pub entries: Vec<Reading>,
}

impl Readings {
    /// Value read for channel `channel_id`
    pub fn get(&self, channel_id: u8) -> Option<u16> {
        self.entries
            .iter()
            .find(|r| r.channel.id == channel_id)
            .map(|r| r.value)
    }

    /// Readings in configuration order
    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.entries.iter()
    }
}

/// Single live binding to the analog subsystem
pub struct AcquisitionSession<S: AnalogSubsystem> {
    subsystem: S,
    acquisition: AcquisitionConfig,
    state: SessionState,
    /// Subsystem `open` has been issued, so teardown must issue `close`
    init_attempted: bool,
    /// Subsystem `open` succeeded and has not failed since
    opened: bool,
    channels: Vec<SensorChannel>,
    triggers: Vec<TriggerSpec>,
    last_error: Option<String>,
}

impl<S: AnalogSubsystem> AcquisitionSession<S> {
    /// Uninitialized session using the default sampling parameters
    pub fn new(subsystem: S) -> Self {
        Self::with_acquisition(subsystem, AcquisitionConfig::default())
    }

    /// Uninitialized session with explicit sampling parameters
    pub fn with_acquisition(subsystem: S, acquisition: AcquisitionConfig) -> Self {
        Self {
            subsystem,
            acquisition,
            state: SessionState::Uninitialized,
            init_attempted: false,
            opened: false,
            channels: Vec::new(),
            triggers: Vec::new(),
            last_error: None,
        }
    }

    /// Create and initialize a session in one step.
    ///
    /// On failure the half-built session is dropped, which tears the
    /// subsystem down before the error is returned.
    pub fn open(subsystem: S, board: &BoardConfig) -> Result<Self, InitError> {
        let mut session = Self::new(subsystem);
        session.init(board)?;
        Ok(session)
    }

    /// Bind to the subsystem with the board's pin selector and mode flags.
    ///
    /// Allowed from `Uninitialized` and, as a re-init, from `Error`; a
    /// re-init first releases whatever the previous attempt acquired.
    pub fn init(&mut self, board: &BoardConfig) -> Result<(), InitError> {
        if !self.state.can_init() {
            let err = InitError::InvalidState { state: self.state };
            warn!(error = %err, "Rejected init");
            self.last_error = Some(err.to_string());
            return Err(err);
        }

        if self.init_attempted {
            debug!("Releasing subsystem before re-init");
            self.subsystem.close();
        }
        self.init_attempted = true;
        self.channels.clear();
        self.triggers.clear();

        match self.subsystem.open(board.pin_selector, board.mode_flags) {
            Ok(()) => {
                self.opened = true;
                self.state = SessionState::Configured;
                self.last_error = None;
                info!(
                    pin_selector = board.pin_selector,
                    mode_flags = board.mode_flags,
                    "Analog subsystem opened"
                );
                Ok(())
            }
            Err(diagnostic) => {
                self.opened = false;
                self.state = SessionState::Error;
                error!(%diagnostic, "Initialization failed");
                self.last_error = Some(diagnostic.clone());
                Err(InitError::OpenFailed { diagnostic: Some(diagnostic) })
            }
        }
    }

    /// Bind each `(channel id, step)` pair and start continuous sampling.
    ///
    /// Replaces any previous channel set and discards armed triggers. A
    /// subsystem rejection leaves the session in `Error` with no channels.
    pub fn configure_channels(&mut self, bindings: &[(u8, u8)]) -> Result<(), ConfigError> {
        let reconfigurable = self.state.can_arm() || (self.state == SessionState::Error && self.opened);
        if !reconfigurable {
            let err = ConfigError::new(
                ConfigErrorKind::InvalidState,
                format!("cannot configure channels in state {}", self.state),
            );
            self.last_error = err.diagnostic.clone();
            return Err(err);
        }

        let channels = match build_channels(bindings) {
            Ok(channels) => channels,
            Err(reason) => {
                warn!(%reason, "Rejected channel configuration");
                self.last_error = Some(reason.clone());
                return Err(ConfigError::new(ConfigErrorKind::InvalidChannels, reason));
            }
        };

        self.channels.clear();
        self.triggers.clear();

        for channel in &channels {
            if let Err(diagnostic) = self.subsystem.assign_step(channel.step, channel.id) {
                return Err(self.fail_configuration(ConfigErrorKind::StepRejected, diagnostic));
            }
            debug!(step = channel.step, channel = channel.id, "Step assigned");
        }

        let mask = ChannelMask::from_channels(&channels);
        let params = AcquisitionParams::new(&self.acquisition, mask.bits());
        if let Err(diagnostic) = self.subsystem.configure(&params) {
            return Err(self.fail_configuration(ConfigErrorKind::Rejected, diagnostic));
        }

        info!(
            mask = mask.bits(),
            channels = channels.len(),
            sample_rate = params.sample_rate,
            "Channels configured"
        );
        self.channels = channels;
        self.state = SessionState::Configured;
        Ok(())
    }

    fn fail_configuration(&mut self, kind: ConfigErrorKind, diagnostic: String) -> ConfigError {
        error!(%diagnostic, ?kind, "Config failed");
        self.state = SessionState::Error;
        self.channels.clear();
        self.triggers.clear();
        self.last_error = Some(diagnostic.clone());
        ConfigError::new(kind, diagnostic)
    }

    /// Arm a threshold trigger on a configured channel.
    ///
    /// Arming is additive; the first success moves the session to `Armed`.
    /// Failures never change the session state.
    pub fn arm_trigger(
        &mut self,
        channel_id: u8,
        direction: Direction,
        threshold: u16,
    ) -> Result<TriggerHandle, ArmError> {
        let result = self.try_arm(channel_id, direction, threshold);
        if let Err(err) = &result {
            warn!(channel = channel_id, threshold, error = %err, "Setting trigger failed");
            self.last_error = err.diagnostic.clone();
        }
        result
    }

    fn try_arm(&mut self, channel_id: u8, direction: Direction, threshold: u16) -> Result<TriggerHandle, ArmError> {
        if !self.state.can_arm() {
            return Err(ArmError::new(
                ArmErrorKind::InvalidState,
                format!("cannot arm triggers in state {}", self.state),
            ));
        }

        let channel = self.channel(channel_id).ok_or_else(|| {
            ArmError::new(
                ArmErrorKind::UnknownChannel,
                format!("channel {} is not configured", channel_id),
            )
        })?;

        if self.triggers.len() >= MAX_WAIT_TRIGGERS {
            return Err(ArmError::new(
                ArmErrorKind::SlotsExhausted,
                format!("all {} trigger slots in use", MAX_WAIT_TRIGGERS),
            ));
        }

        let signed_threshold = direction.encode(threshold);
        if direction == Direction::Falling && threshold == 0 {
            // -0 is indistinguishable from +0 on the wire
            warn!(channel = channel_id, "Falling trigger at 0 is armed as rising above 0");
        }
        let raw = self.subsystem.arm_threshold_trigger(channel.step, signed_threshold);
        let handle = TriggerHandle::from_raw(raw).ok_or_else(|| ArmError {
            kind: ArmErrorKind::Rejected,
            diagnostic: Some(
                self.subsystem
                    .diagnostic()
                    .unwrap_or_else(|| "trigger rejected by subsystem".to_string()),
            ),
        })?;

        self.triggers.push(TriggerSpec {
            channel,
            direction,
            threshold,
            handle,
        });
        if self.state == SessionState::Configured {
            self.state = SessionState::Armed;
        }

        debug!(%handle, step = channel.step, signed_threshold, "Trigger armed");
        Ok(handle)
    }

    /// Block until any of `handles` fires, or until `timeout` elapses.
    ///
    /// At most four handles may be watched at once. There is no way to
    /// cancel a wait in progress other than the timeout.
    pub fn wait(&mut self, handles: &[TriggerHandle], timeout: Option<Duration>) -> Result<FiredSet, WaitError> {
        if handles.len() > MAX_WAIT_TRIGGERS {
            return Err(self.reject_wait(WaitError::TooManyTriggers {
                count: handles.len(),
                limit: MAX_WAIT_TRIGGERS,
            }));
        }

        let mut slots = [0u32; MAX_WAIT_TRIGGERS];
        for (slot, handle) in slots.iter_mut().zip(handles) {
            *slot = handle.raw();
        }
        self.wait_slots(&slots, timeout)
    }

    /// Wait on raw hardware slots, where `0` marks an unused slot
    pub fn wait_slots(&mut self, slots: &[u32; 4], timeout: Option<Duration>) -> Result<FiredSet, WaitError> {
        if slots.iter().all(|raw| *raw == 0) {
            return Err(self.reject_wait(WaitError::NoTriggers));
        }
        if self.state != SessionState::Armed {
            return Err(self.reject_wait(WaitError::InvalidState { state: self.state }));
        }
        if let Some(&unknown) = slots
            .iter()
            .find(|raw| **raw != 0 && !self.triggers.iter().any(|t| t.handle.raw() == **raw))
        {
            return Err(self.reject_wait(WaitError::UnknownTrigger { handle: unknown }));
        }

        debug!(?slots, ?timeout, "Waiting for triggers");
        match self.subsystem.wait_any(slots, timeout) {
            Ok(fired) if fired.is_empty() => match timeout {
                Some(_) => Err(self.reject_wait(WaitError::TimedOut { diagnostic: None })),
                None => Err(self.fail_wait("wait returned without a fired trigger".to_string())),
            },
            Ok(fired) => {
                let fired: Vec<TriggerHandle> = fired.into_iter().filter_map(TriggerHandle::from_raw).collect();
                info!(fired = fired.len(), "Trigger fired");
                Ok(FiredSet::new(fired))
            }
            Err(diagnostic) => Err(self.fail_wait(diagnostic)),
        }
    }

    /// Record a wait rejected locally or ended by its timeout
    fn reject_wait(&mut self, err: WaitError) -> WaitError {
        debug!(error = %err, "Wait ended without trigger");
        self.last_error = Some(err.to_string());
        err
    }

    fn fail_wait(&mut self, diagnostic: String) -> WaitError {
        error!(%diagnostic, "Starting measurement failed");
        self.last_error = Some(diagnostic.clone());
        WaitError::Subsystem { diagnostic: Some(diagnostic) }
    }

    /// Most recent raw sample of a configured channel, without blocking.
    ///
    /// Before the first physical sample the value is whatever the driver
    /// initialised the buffer with.
    pub fn read_latest(&self, channel_id: u8) -> Result<u16, ReadError> {
        if !self.state.can_read() {
            return Err(ReadError::NotReady { state: self.state });
        }
        if self.channel(channel_id).is_none() {
            return Err(ReadError::UnknownChannel { channel: channel_id });
        }
        Ok(self.subsystem.read_value(channel_id))
    }

    /// Latest sample of every configured channel
    pub fn read_all(&self) -> Result<Readings, ReadError> {
        if !self.state.can_read() {
            return Err(ReadError::NotReady { state: self.state });
        }
        let entries = self
            .channels
            .iter()
            .map(|&channel| Reading {
                channel,
                value: self.subsystem.read_value(channel.id),
            })
            .collect();
        Ok(Readings { entries })
    }

    /// Release the subsystem. Idempotent and infallible.
    pub fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }

        if self.init_attempted {
            self.subsystem.close();
        }
        self.channels.clear();
        self.triggers.clear();
        self.opened = false;
        self.state = SessionState::Closed;
        info!("Acquisition session closed");
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configured channels in configuration order
    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    /// Configured channel with analog input `channel_id`
    pub fn channel(&self, channel_id: u8) -> Option<SensorChannel> {
        self.channels.iter().copied().find(|ch| ch.id == channel_id)
    }

    /// Armed triggers in arming order
    pub fn triggers(&self) -> &[TriggerSpec] {
        &self.triggers
    }

    /// Armed trigger with `handle`
    pub fn trigger(&self, handle: TriggerHandle) -> Option<&TriggerSpec> {
        self.triggers.iter().find(|t| t.handle == handle)
    }

    /// Mask of the configured channels
    pub fn channel_mask(&self) -> ChannelMask {
        ChannelMask::from_channels(&self.channels)
    }

    /// Diagnostic of the most recent failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl<S: AnalogSubsystem> Drop for AcquisitionSession<S> {
    fn drop(&mut self) {
        self.close();
    }
}
