// src/acquisition/trigger.rs
//! Threshold triggers and their direction encoding

use crate::acquisition::channels::SensorChannel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Which crossing of the threshold fires the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Fires when the sample drops below the threshold
    Falling,
    /// Fires when the sample rises above the threshold
    Rising,
}

impl Direction {
    /// Signed threshold the comparator expects: negative magnitudes mean
    /// "fire when the sample falls below |value|".
    pub fn encode(self, magnitude: u16) -> i32 {
        match self {
            Direction::Falling => -i32::from(magnitude),
            Direction::Rising => i32::from(magnitude),
        }
    }

    /// Whether `sample` is past `threshold` in this direction
    pub fn is_crossed(self, threshold: u16, sample: u16) -> bool {
        match self {
            Direction::Falling => sample < threshold,
            Direction::Rising => sample > threshold,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Falling => write!(f, "falling"),
            Direction::Rising => write!(f, "rising"),
        }
    }
}

/// Opaque non-zero token identifying an armed trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriggerHandle(NonZeroU32);

impl TriggerHandle {
    /// Wrap a raw subsystem handle; `0` means arming failed
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// Handle value as the subsystem knows it
    pub fn raw(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "trigger#{:x}", self.0.get())
    }
}

/// An armed one-sided threshold condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerSpec {
    /// Channel the comparator watches
    pub channel: SensorChannel,
    /// Crossing that fires
    pub direction: Direction,
    /// Unsigned threshold magnitude
    pub threshold: u16,
    /// Handle returned by the subsystem
    pub handle: TriggerHandle,
}

impl TriggerSpec {
    /// Value passed to the subsystem when arming
    pub fn signed_threshold(&self) -> i32 {
        self.direction.encode(self.threshold)
    }

    /// Whether `sample` satisfies the condition
    pub fn is_met_by(&self, sample: u16) -> bool {
        self.direction.is_crossed(self.threshold, sample)
    }
}

/// Triggers reported by one wait, in firing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiredSet(Vec<TriggerHandle>);

impl FiredSet {
    pub(crate) fn new(handles: Vec<TriggerHandle>) -> Self {
        Self(handles)
    }

    /// Whether `handle` fired
    pub fn contains(&self, handle: TriggerHandle) -> bool {
        self.0.contains(&handle)
    }

    /// Fired handles in firing order
    pub fn handles(&self) -> &[TriggerHandle] {
        &self.0
    }

    /// First trigger that fired
    pub fn first(&self) -> Option<TriggerHandle> {
        self.0.first().copied()
    }

    /// Number of fired triggers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No trigger fired
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fired handles in firing order
    pub fn iter(&self) -> impl Iterator<Item = TriggerHandle> + '_ {
        self.0.iter().copied()
    }
}

impl IntoIterator for FiredSet {
    type Item = TriggerHandle;
    type IntoIter = std::vec::IntoIter<TriggerHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_encoding() {
        assert_eq!(Direction::Falling.encode(25_000), -25_000);
        assert_eq!(Direction::Rising.encode(25_000), 25_000);
        assert_eq!(Direction::Falling.encode(u16::MAX), -65_535);
        assert_eq!(Direction::Falling.encode(0), 0);
    }

    #[test]
    fn test_direction_crossing() {
        assert!(Direction::Falling.is_crossed(15_000, 14_999));
        assert!(!Direction::Falling.is_crossed(15_000, 15_000));
        assert!(Direction::Rising.is_crossed(15_000, 15_001));
        assert!(!Direction::Rising.is_crossed(0, 0));
    }

    #[test]
    fn test_zero_handle_is_failure() {
        assert!(TriggerHandle::from_raw(0).is_none());
        assert_eq!(TriggerHandle::from_raw(7).map(|h| h.raw()), Some(7));
    }

    #[test]
    fn test_condition_check() {
        let spec = TriggerSpec {
            channel: SensorChannel::new(1, 11),
            direction: Direction::Falling,
            threshold: 15_000,
            handle: TriggerHandle::from_raw(1).unwrap(),
        };
        assert!(spec.is_met_by(14_999));
        assert!(!spec.is_met_by(15_000));
        assert_eq!(spec.signed_threshold(), -15_000);

        let rising = TriggerSpec { direction: Direction::Rising, ..spec };
        assert!(rising.is_met_by(15_001));
        assert!(!rising.is_met_by(15_000));
    }

    #[test]
    fn test_direction_serde() {
        let json = serde_json::to_string(&Direction::Rising).unwrap();
        assert_eq!(json, "\"rising\"");
        let parsed: Direction = serde_json::from_str("\"falling\"").unwrap();
        assert_eq!(parsed, Direction::Falling);
    }
}
