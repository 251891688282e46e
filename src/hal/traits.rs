// src/hal/traits.rs
//! Core HAL trait for the analog I/O subsystem

use crate::hal::types::AcquisitionParams;
use std::time::Duration;

/// Narrow capability interface the session drives.
///
/// Implementations own the memory-mapped registers, coprocessor firmware
/// and interrupt plumbing. Fallible calls report the subsystem's own
/// diagnostic text; trigger arming follows the hardware convention of
/// returning `0` on failure, with the reason available from
/// [`diagnostic`](AnalogSubsystem::diagnostic).
pub trait AnalogSubsystem {
    /// Bind to the hardware with a board-specific pin selector and mode
    fn open(&mut self, pin_selector: u8, mode_flags: u8) -> Result<(), String>;

    /// Bind acquisition step `step` to analog input `analog_input`
    fn assign_step(&mut self, step: u8, analog_input: u8) -> Result<(), String>;

    /// Start continuous sampling of the channels in `params.channel_mask`
    fn configure(&mut self, params: &AcquisitionParams) -> Result<(), String>;

    /// Arm a comparator on `step`; negative thresholds fire when the sample
    /// falls below the magnitude. Returns `0` when arming is rejected.
    fn arm_threshold_trigger(&mut self, step: u8, signed_threshold: i32) -> u32;

    /// Last diagnostic reported by the subsystem
    fn diagnostic(&self) -> Option<String>;

    /// Block until any trigger in `slots` fires. A `0` slot is unused.
    /// Returns the fired trigger handles in firing order; an empty list
    /// means `timeout` elapsed first.
    fn wait_any(&mut self, slots: &[u32; 4], timeout: Option<Duration>) -> Result<Vec<u32>, String>;

    /// Latest raw sample of analog input `channel_index`
    fn read_value(&self, channel_index: u8) -> u16;

    /// Release the hardware. Must tolerate a handle whose `open` failed.
    fn close(&mut self);
}

impl<T: AnalogSubsystem + ?Sized> AnalogSubsystem for Box<T> {
    fn open(&mut self, pin_selector: u8, mode_flags: u8) -> Result<(), String> {
        (**self).open(pin_selector, mode_flags)
    }

    fn assign_step(&mut self, step: u8, analog_input: u8) -> Result<(), String> {
        (**self).assign_step(step, analog_input)
    }

    fn configure(&mut self, params: &AcquisitionParams) -> Result<(), String> {
        (**self).configure(params)
    }

    fn arm_threshold_trigger(&mut self, step: u8, signed_threshold: i32) -> u32 {
        (**self).arm_threshold_trigger(step, signed_threshold)
    }

    fn diagnostic(&self) -> Option<String> {
        (**self).diagnostic()
    }

    fn wait_any(&mut self, slots: &[u32; 4], timeout: Option<Duration>) -> Result<Vec<u32>, String> {
        (**self).wait_any(slots, timeout)
    }

    fn read_value(&self, channel_index: u8) -> u16 {
        (**self).read_value(channel_index)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
