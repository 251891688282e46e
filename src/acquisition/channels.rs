// src/acquisition/channels.rs
//! Channel-to-step bindings and the channel-enable mask

use crate::config::constants::hardware::{MASK_CHANNEL_OFFSET, MAX_ANALOG_INPUTS, MAX_STEP};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One physical analog input bound to an acquisition step slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorChannel {
    /// Analog input index
    pub id: u8,
    /// Step slot sampling this input
    pub step: u8,
}

impl SensorChannel {
    /// Bind analog input `id` to step slot `step`
    pub fn new(id: u8, step: u8) -> Self {
        Self { id, step }
    }

    /// Bit this channel occupies in the channel-enable mask; `0` when the
    /// id has no bit in a 32-bit mask
    pub fn mask_bit(&self) -> u32 {
        1u32.checked_shl(u32::from(self.id) + u32::from(MASK_CHANNEL_OFFSET))
            .unwrap_or(0)
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AIN{}@step{}", self.id, self.step)
    }
}

/// Channel-enable bitfield consumed by the subsystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChannelMask(u32);

impl ChannelMask {
    /// Mask with one bit per channel
    pub fn from_channels<'a>(channels: impl IntoIterator<Item = &'a SensorChannel>) -> Self {
        Self(channels.into_iter().fold(0, |mask, ch| mask | ch.mask_bit()))
    }

    /// Raw mask value
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Number of enabled channels
    pub fn count(&self) -> u8 {
        self.0.count_ones() as u8
    }

    /// Whether channel `channel_id` is enabled
    pub fn contains(&self, channel_id: u8) -> bool {
        channel_id < MAX_ANALOG_INPUTS && self.0 & SensorChannel::new(channel_id, 0).mask_bit() != 0
    }
}

impl fmt::Display for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#011b}", self.0)
    }
}

/// Validate `(id, step)` pairs and turn them into channels in input order.
///
/// Ids and steps must be in range and pairwise distinct, and at least one
/// pair is required.
pub fn build_channels(bindings: &[(u8, u8)]) -> Result<Vec<SensorChannel>, String> {
    if bindings.is_empty() {
        return Err("no channels requested".to_string());
    }

    let mut channels: Vec<SensorChannel> = Vec::with_capacity(bindings.len());
    for &(id, step) in bindings {
        if id >= MAX_ANALOG_INPUTS {
            return Err(format!("channel {} out of range (0..{})", id, MAX_ANALOG_INPUTS));
        }
        if step > MAX_STEP {
            return Err(format!("step {} out of range (0..={})", step, MAX_STEP));
        }
        if channels.iter().any(|ch| ch.id == id) {
            return Err(format!("channel {} requested twice", id));
        }
        if channels.iter().any(|ch| ch.step == step) {
            return Err(format!("step {} requested twice", step));
        }
        channels.push(SensorChannel::new(id, step));
    }

    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_bits_are_offset_by_one() {
        let channels = build_channels(&[(1, 11), (2, 12)]).unwrap();
        let mask = ChannelMask::from_channels(&channels);

        assert_eq!(mask.bits(), (1 << 2) | (1 << 3));
        assert_eq!(mask.count(), 2);
        assert!(mask.contains(1));
        assert!(mask.contains(2));
        assert!(!mask.contains(0));
    }

    #[test]
    fn test_channel_zero_does_not_touch_control_bit() {
        let mask = ChannelMask::from_channels(&[SensorChannel::new(0, 0)]);
        assert_eq!(mask.bits() & 1, 0);
        assert_eq!(mask.bits(), 0b10);
    }

    #[test]
    fn test_ids_beyond_mask_width_contribute_nothing() {
        assert_eq!(SensorChannel::new(30, 0).mask_bit(), 1 << 31);
        assert_eq!(SensorChannel::new(31, 0).mask_bit(), 0);
        assert_eq!(SensorChannel::new(u8::MAX, 0).mask_bit(), 0);

        let mask = ChannelMask::from_channels(&[SensorChannel::new(40, 0), SensorChannel::new(1, 11)]);
        assert_eq!(mask.bits(), 1 << 2);
        assert!(!mask.contains(40));
        assert!(!mask.contains(u8::MAX));
    }

    #[test]
    fn test_order_is_preserved() {
        let channels = build_channels(&[(5, 2), (0, 9), (3, 1)]).unwrap();
        let ids: Vec<u8> = channels.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![5, 0, 3]);
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(build_channels(&[(1, 11), (1, 12)]).unwrap_err().contains("channel 1"));
        assert!(build_channels(&[(1, 11), (2, 11)]).unwrap_err().contains("step 11"));
    }

    #[test]
    fn test_rejects_out_of_range_and_empty() {
        assert!(build_channels(&[]).is_err());
        assert!(build_channels(&[(8, 0)]).is_err());
        assert!(build_channels(&[(0, 16)]).is_err());
        assert!(build_channels(&[(7, 15)]).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorChannel::new(1, 11).to_string(), "AIN1@step11");
        assert_eq!(ChannelMask::from_channels(&[SensorChannel::new(1, 11)]).to_string(), "0b000000100");
    }
}
