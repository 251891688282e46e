// src/hal/types.rs
//! Types exchanged with the analog subsystem

use crate::config::AcquisitionConfig;
use serde::{Deserialize, Serialize};

/// Parameters of the subsystem's configuration entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionParams {
    /// Samples per acquisition cycle
    pub sample_rate: u32,
    /// One bit per sampled channel, at `channel + 1`
    pub channel_mask: u32,
    /// Number of channels in the mask
    pub channel_count: u8,
    /// Sampling timer period in nanoseconds
    pub timer_period_ns: u32,
    /// Clock divider / measurement mode selector
    pub clock_divider: u32,
    /// Always zero
    pub reserved: u32,
}

impl AcquisitionParams {
    /// Parameters for `channel_mask` using the configured sampling settings
    pub fn new(config: &AcquisitionConfig, channel_mask: u32) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channel_mask,
            channel_count: channel_mask.count_ones() as u8,
            timer_period_ns: config.timer_period_ns,
            clock_divider: config.clock_divider,
            reserved: 0,
        }
    }
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self::new(&AcquisitionConfig::default(), 0)
    }
}
