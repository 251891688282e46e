// src/hal/tests.rs
//! Unit tests for HAL components

use crate::config::AcquisitionConfig;
use crate::hal::simulator::{SimulatedBoard, SubsystemCall};
use crate::hal::{AcquisitionParams, AnalogSubsystem};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_params_from_config() {
        let config = AcquisitionConfig::default();
        let params = AcquisitionParams::new(&config, (1 << 2) | (1 << 3));

        assert_eq!(params.sample_rate, 10);
        assert_eq!(params.channel_count, 2);
        assert_eq!(params.timer_period_ns, 1_000_000);
        assert_eq!(params.clock_divider, 4);
        assert_eq!(params.reserved, 0);
    }

    #[test]
    fn test_default_params_have_empty_mask() {
        let params = AcquisitionParams::default();
        assert_eq!(params.channel_mask, 0);
        assert_eq!(params.channel_count, 0);
    }

    #[test]
    fn test_params_serialization() {
        let params = AcquisitionParams::new(&AcquisitionConfig::default(), 0b110);
        let json = serde_json::to_string(&params).expect("Failed to serialize");
        let deserialized: AcquisitionParams = serde_json::from_str(&json).expect("Failed to deserialize");

        assert_eq!(params, deserialized);
    }

    #[test]
    fn test_boxed_subsystem_forwards_calls() {
        let board = SimulatedBoard::new();
        let mut boxed: Box<dyn AnalogSubsystem> = Box::new(board.subsystem());

        boxed.open(0x98, 1).expect("Failed to open");
        boxed.close();

        assert_eq!(
            board.calls(),
            vec![
                SubsystemCall::Open { pin_selector: 0x98, mode_flags: 1 },
                SubsystemCall::Close,
            ]
        );
    }
}
