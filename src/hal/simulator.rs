//! Simulated analog subsystem
//!
//! [`SimulatedBoard`] stands in for the coprocessor-backed ADC. It keeps a
//! live sample buffer for every analog input, evaluates armed comparators
//! whenever a sample is published, and wakes blocked waiters through a
//! condition variable. Sessions talk to it through [`SimulatedSubsystem`];
//! tests and the drop-watch binary publish samples through [`SampleFeed`]
//! or a [`BackgroundProducer`] thread.
//!
//! Every subsystem call is recorded so tests can assert which calls a
//! session made (or that it made none).

use crate::config::constants::hardware::{MAX_ANALOG_INPUTS, MAX_STEP, MAX_THRESHOLD, MAX_WAIT_TRIGGERS};
use crate::hal::{AcquisitionParams, AnalogSubsystem};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const INPUTS: usize = MAX_ANALOG_INPUTS as usize;
const STEPS: usize = MAX_STEP as usize + 1;

/// One call made into the simulated subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsystemCall {
    /// `open`
    Open {
        /// Pin selector passed in
        pin_selector: u8,
        /// Mode flags passed in
        mode_flags: u8,
    },
    /// `assign_step`
    AssignStep {
        /// Step slot
        step: u8,
        /// Analog input bound to the slot
        analog_input: u8,
    },
    /// `configure`
    Configure(AcquisitionParams),
    /// `arm_threshold_trigger`
    ArmTrigger {
        /// Step slot
        step: u8,
        /// Direction-encoded threshold
        signed_threshold: i32,
    },
    /// `wait_any` with its four slots
    WaitAny([u32; 4]),
    /// `read_value` for an analog input
    ReadValue(u8),
    /// `close`
    Close,
}

/// Subsystem entry point that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `open`
    Open,
    /// `assign_step`
    AssignStep,
    /// `configure`
    Configure,
    /// `arm_threshold_trigger`
    Arm,
    /// `wait_any`
    Wait,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTrigger {
    handle: u32,
    analog_input: u8,
    signed_threshold: i32,
}

impl ArmedTrigger {
    fn is_satisfied(&self, sample: u16) -> bool {
        let magnitude = self.signed_threshold.unsigned_abs();
        if self.signed_threshold < 0 {
            u32::from(sample) < magnitude
        } else {
            u32::from(sample) > magnitude
        }
    }
}

#[derive(Debug, Default)]
struct BoardState {
    claimed: bool,
    samples: [u16; INPUTS],
    steps: [Option<u8>; STEPS],
    sampling_mask: u32,
    triggers: Vec<ArmedTrigger>,
    next_handle: u32,
    pending_fires: Vec<u32>,
    diagnostic: Option<String>,
    faults: Vec<(Fault, String)>,
    calls: Vec<SubsystemCall>,
    recording: bool,
}

impl BoardState {
    fn record(&mut self, call: SubsystemCall) {
        if self.recording {
            self.calls.push(call);
        }
    }

    fn is_sampled(&self, analog_input: u8) -> bool {
        self.sampling_mask & (1 << (analog_input + 1)) != 0
    }

    fn take_fault(&mut self, fault: Fault) -> Option<String> {
        let index = self.faults.iter().position(|(f, _)| *f == fault)?;
        Some(self.faults.remove(index).1)
    }

    fn fail<T>(&mut self, message: impl Into<String>) -> Result<T, String> {
        let message = message.into();
        self.diagnostic = Some(message.clone());
        Err(message)
    }

    fn satisfied_triggers(&self, watched: &[u32]) -> Vec<u32> {
        self.triggers
            .iter()
            .filter(|t| watched.contains(&t.handle))
            .filter(|t| self.is_sampled(t.analog_input))
            .filter(|t| t.is_satisfied(self.samples[t.analog_input as usize]))
            .map(|t| t.handle)
            .collect()
    }

    fn reset_acquisition(&mut self) {
        self.steps = [None; STEPS];
        self.sampling_mask = 0;
        self.triggers.clear();
        self.pending_fires.clear();
    }
}

struct Shared {
    state: Mutex<BoardState>,
    fired: Condvar,
}

/// A simulated ADC board shared between a session and sample producers
#[derive(Clone)]
pub struct SimulatedBoard {
    shared: Arc<Shared>,
}

impl SimulatedBoard {
    /// Board with every input reading zero
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BoardState {
                    next_handle: 1,
                    recording: true,
                    ..Default::default()
                }),
                fired: Condvar::new(),
            }),
        }
    }

    /// Subsystem handle for an acquisition session
    pub fn subsystem(&self) -> SimulatedSubsystem {
        SimulatedSubsystem {
            shared: Arc::clone(&self.shared),
            holds_claim: false,
        }
    }

    /// Producer handle publishing samples into the live buffer
    pub fn feed(&self) -> SampleFeed {
        SampleFeed {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Make the next call to `fault`'s entry point fail with `message`
    pub fn inject_fault(&self, fault: Fault, message: impl Into<String>) {
        self.shared.state.lock().faults.push((fault, message.into()));
    }

    /// Remove all pending injected faults
    pub fn clear_faults(&self) {
        self.shared.state.lock().faults.clear();
    }

    /// Calls made so far, oldest first
    pub fn calls(&self) -> Vec<SubsystemCall> {
        self.shared.state.lock().calls.clone()
    }

    /// Start or stop recording calls; a board starts out recording
    pub fn set_recording(&self, on: bool) {
        self.shared.state.lock().recording = on;
    }

    /// Forget the recorded calls
    pub fn clear_calls(&self) {
        self.shared.state.lock().calls.clear();
    }

    /// Whether a subsystem handle currently holds the board open
    pub fn is_claimed(&self) -> bool {
        self.shared.state.lock().claimed
    }

    /// Channel mask the board is currently sampling
    pub fn sampling_mask(&self) -> u32 {
        self.shared.state.lock().sampling_mask
    }

    /// Number of armed comparators
    pub fn armed_triggers(&self) -> usize {
        self.shared.state.lock().triggers.len()
    }
}

impl Default for SimulatedBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes raw samples into a [`SimulatedBoard`]
#[derive(Clone)]
pub struct SampleFeed {
    shared: Arc<Shared>,
}

impl SampleFeed {
    /// Publish one sample and evaluate comparators watching that input
    pub fn set_sample(&self, analog_input: u8, value: u16) {
        self.set_samples(&[(analog_input, value)]);
    }

    /// Publish several samples atomically
    pub fn set_samples(&self, samples: &[(u8, u16)]) {
        let mut state = self.shared.state.lock();
        let mut any_fired = false;

        for &(analog_input, value) in samples {
            let Some(slot) = state.samples.get_mut(analog_input as usize) else {
                continue;
            };
            *slot = value;

            if !state.is_sampled(analog_input) {
                continue;
            }
            let fired: Vec<u32> = state
                .triggers
                .iter()
                .filter(|t| t.analog_input == analog_input && t.is_satisfied(value))
                .map(|t| t.handle)
                .collect();
            for handle in fired {
                if !state.pending_fires.contains(&handle) {
                    trace!(handle, analog_input, value, "Simulated comparator fired");
                    state.pending_fires.push(handle);
                    any_fired = true;
                }
            }
        }

        drop(state);
        if any_fired {
            self.shared.fired.notify_all();
        }
    }

    /// Current value of an input's sample buffer
    pub fn sample(&self, analog_input: u8) -> u16 {
        self.shared
            .state
            .lock()
            .samples
            .get(analog_input as usize)
            .copied()
            .unwrap_or(0)
    }
}

/// Session-side handle implementing [`AnalogSubsystem`]
pub struct SimulatedSubsystem {
    shared: Arc<Shared>,
    holds_claim: bool,
}

impl AnalogSubsystem for SimulatedSubsystem {
    fn open(&mut self, pin_selector: u8, mode_flags: u8) -> Result<(), String> {
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::Open { pin_selector, mode_flags });

        if let Some(message) = state.take_fault(Fault::Open) {
            return state.fail(message);
        }
        if state.claimed && !self.holds_claim {
            return state.fail("analog subsystem busy: already opened by another session");
        }

        state.claimed = true;
        state.diagnostic = None;
        self.holds_claim = true;
        debug!(pin_selector, mode_flags, "Simulated subsystem opened");
        Ok(())
    }

    fn assign_step(&mut self, step: u8, analog_input: u8) -> Result<(), String> {
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::AssignStep { step, analog_input });

        if let Some(message) = state.take_fault(Fault::AssignStep) {
            return state.fail(message);
        }
        if !self.holds_claim {
            return state.fail("subsystem not open");
        }
        if step > MAX_STEP {
            return state.fail(format!("step number too big ({} > {})", step, MAX_STEP));
        }
        if analog_input >= MAX_ANALOG_INPUTS {
            return state.fail(format!("no such analog input (AIN{})", analog_input));
        }

        state.steps[step as usize] = Some(analog_input);
        Ok(())
    }

    fn configure(&mut self, params: &AcquisitionParams) -> Result<(), String> {
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::Configure(*params));

        if let Some(message) = state.take_fault(Fault::Configure) {
            return state.fail(message);
        }
        if !self.holds_claim {
            return state.fail("subsystem not open");
        }
        if params.sample_rate == 0 {
            return state.fail("unsupported sample rate (0)");
        }
        let valid_bits = ((1u32 << MAX_ANALOG_INPUTS) - 1) << 1;
        if params.channel_mask == 0 || params.channel_mask & !valid_bits != 0 {
            return state.fail(format!("invalid channel mask ({:#x})", params.channel_mask));
        }
        for input in 0..MAX_ANALOG_INPUTS {
            if params.channel_mask & (1 << (input + 1)) != 0
                && !state.steps.iter().any(|s| *s == Some(input))
            {
                return state.fail(format!("no step configured for AIN{}", input));
            }
        }

        state.sampling_mask = params.channel_mask;
        state.triggers.clear();
        state.pending_fires.clear();
        debug!(mask = params.channel_mask, "Simulated sampling configured");
        Ok(())
    }

    fn arm_threshold_trigger(&mut self, step: u8, signed_threshold: i32) -> u32 {
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::ArmTrigger { step, signed_threshold });

        let bound_input = state.steps.get(step as usize).copied().flatten();
        let rejection = if let Some(message) = state.take_fault(Fault::Arm) {
            Some(message)
        } else if !self.holds_claim || state.sampling_mask == 0 {
            Some("sampling not configured".to_string())
        } else if signed_threshold.unsigned_abs() > u32::from(MAX_THRESHOLD) {
            Some(format!("threshold out of range ({})", signed_threshold))
        } else if state.triggers.len() >= MAX_WAIT_TRIGGERS {
            Some(format!("no free trigger slot (max {})", MAX_WAIT_TRIGGERS))
        } else {
            match bound_input {
                Some(input) if state.is_sampled(input) => {
                    let handle = state.next_handle;
                    state.next_handle = state.next_handle.wrapping_add(1).max(1);
                    state.triggers.push(ArmedTrigger {
                        handle,
                        analog_input: input,
                        signed_threshold,
                    });
                    return handle;
                }
                Some(input) => Some(format!("AIN{} is not sampled", input)),
                None => Some(format!("step {} not configured", step)),
            }
        };

        state.diagnostic = rejection;
        0
    }

    fn diagnostic(&self) -> Option<String> {
        self.shared.state.lock().diagnostic.clone()
    }

    fn wait_any(&mut self, slots: &[u32; 4], timeout: Option<Duration>) -> Result<Vec<u32>, String> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::WaitAny(*slots));

        if let Some(message) = state.take_fault(Fault::Wait) {
            return state.fail(message);
        }
        if !self.holds_claim || state.sampling_mask == 0 {
            return state.fail("hardware not configured");
        }

        let watched: Vec<u32> = slots.iter().copied().filter(|h| *h != 0).collect();
        if let Some(unknown) = watched.iter().find(|h| !state.triggers.iter().any(|t| t.handle == **h)) {
            return state.fail(format!("unknown trigger {:#x}", unknown));
        }

        // A comparator already past its threshold fires immediately.
        state.pending_fires.clear();
        let fired = state.satisfied_triggers(&watched);
        if !fired.is_empty() {
            return Ok(fired);
        }

        loop {
            match deadline {
                Some(deadline) => {
                    if self.shared.fired.wait_until(&mut state, deadline).timed_out() {
                        return Ok(Vec::new());
                    }
                }
                None => self.shared.fired.wait(&mut state),
            }

            if !self.holds_claim || state.sampling_mask == 0 {
                return state.fail("subsystem torn down while waiting");
            }

            let fired: Vec<u32> = state
                .pending_fires
                .iter()
                .copied()
                .filter(|h| watched.contains(h))
                .collect();
            if !fired.is_empty() {
                state.pending_fires.clear();
                return Ok(fired);
            }
        }
    }

    fn read_value(&self, channel_index: u8) -> u16 {
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::ReadValue(channel_index));
        state.samples.get(channel_index as usize).copied().unwrap_or(0)
    }

    fn close(&mut self) {
        let mut state = self.shared.state.lock();
        state.record(SubsystemCall::Close);

        if self.holds_claim {
            state.reset_acquisition();
            state.claimed = false;
            self.holds_claim = false;
            debug!("Simulated subsystem closed");
        }
        drop(state);
        self.shared.fired.notify_all();
    }
}

/// Signal shape published by a [`BackgroundProducer`]
#[derive(Debug, Clone)]
pub struct DropProfile {
    /// Reading of a sensor that sees the floor
    pub floor_level: u16,
    /// Reading once the floor disappears
    pub drop_level: u16,
    /// Peak-to-peak noise added to every sample
    pub noise: u16,
    /// Input that drops, and after how long; `None` keeps every input on the floor
    pub drop: Option<(u8, Duration)>,
    /// Time between published sample sets
    pub period: Duration,
}

impl Default for DropProfile {
    fn default() -> Self {
        Self {
            floor_level: 40_000,
            drop_level: 8_000,
            noise: 500,
            drop: None,
            period: Duration::from_millis(1),
        }
    }
}

/// Background thread continuously refreshing the sample buffer
pub struct BackgroundProducer {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundProducer {
    /// Start publishing `profile` on `inputs`
    pub fn spawn(feed: SampleFeed, inputs: Vec<u8>, profile: DropProfile) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::spawn(move || {
            let started = Instant::now();
            let mut sequence: u32 = 0;

            while flag.load(Ordering::Relaxed) {
                let elapsed = started.elapsed();
                let samples: Vec<(u8, u16)> = inputs
                    .iter()
                    .map(|&input| {
                        let dropped = matches!(profile.drop, Some((dropping, after)) if dropping == input && elapsed >= after);
                        let base = if dropped { profile.drop_level } else { profile.floor_level };
                        (input, base.saturating_add(noise(sequence, input, profile.noise)))
                    })
                    .collect();

                feed.set_samples(&samples);
                sequence = sequence.wrapping_add(1);
                thread::sleep(profile.period);
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the producer thread and wait for it to exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BackgroundProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Deterministic pseudo-random noise in `0..=amplitude`
fn noise(sequence: u32, input: u8, amplitude: u16) -> u16 {
    if amplitude == 0 {
        return 0;
    }
    let seed = sequence
        .wrapping_mul(1103515245)
        .wrapping_add(12345)
        ^ u32::from(input).wrapping_mul(2654435761);
    (seed % (u32::from(amplitude) + 1)) as u16
}
