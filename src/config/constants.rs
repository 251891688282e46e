// src/config/constants.rs
//! Board limits and default drop-sensor wiring

/// Analog subsystem hardware limits
pub mod hardware {
    /// Analog inputs on the reference board (AIN0..AIN7)
    pub const MAX_ANALOG_INPUTS: u8 = 8;
    /// Highest acquisition step slot
    pub const MAX_STEP: u8 = 15;
    /// Triggers one wait call can watch
    pub const MAX_WAIT_TRIGGERS: usize = 4;
    /// Low mask bits reserved for hardware control; channel `n` lives at bit `n + 1`
    pub const MASK_CHANNEL_OFFSET: u8 = 1;
    /// Largest comparator threshold magnitude
    pub const MAX_THRESHOLD: u16 = u16::MAX;
}

/// Subsystem open parameters for the target board
pub mod board {
    /// Pin/activation selector passed to `open`
    pub const DEFAULT_PIN_SELECTOR: u8 = 0x98;
    /// Mode flags passed to `open`
    pub const DEFAULT_MODE_FLAGS: u8 = 1;
}

/// Acquisition parameters passed to `configure`
pub mod acquisition {
    /// Samples per acquisition cycle
    pub const DEFAULT_SAMPLE_RATE: u32 = 10;
    /// Sampling timer period
    pub const DEFAULT_TIMER_PERIOD_NS: u32 = 1_000_000;
    /// Clock divider / measurement mode selector
    pub const DEFAULT_CLOCK_DIVIDER: u32 = 4;
    /// Poll interval used by the polling loop of the drop-watch binary
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
}

/// Default left/right drop sensor wiring
pub mod sensors {
    /// Name of the left sensor
    pub const LEFT_NAME: &str = "left";
    /// Analog input of the left sensor
    pub const LEFT_AIN: u8 = 1;
    /// Step slot sampling the left sensor
    pub const LEFT_STEP: u8 = 11;
    /// Falling threshold of the left sensor
    pub const LEFT_THRESHOLD: u16 = 25_000;

    /// Name of the right sensor
    pub const RIGHT_NAME: &str = "right";
    /// Analog input of the right sensor
    pub const RIGHT_AIN: u8 = 2;
    /// Step slot sampling the right sensor
    pub const RIGHT_STEP: u8 = 12;
    /// Falling threshold of the right sensor
    pub const RIGHT_THRESHOLD: u16 = 25_000;
}

/// Configuration file discovery
pub mod paths {
    /// File looked up in the working directory when no path is given
    pub const DEFAULT_CONFIG_FILE: &str = "drop_sense.toml";
    /// Prefix of environment overrides, e.g. `DROP_SENSE__BOARD__PIN_SELECTOR`
    pub const ENV_PREFIX: &str = "DROP_SENSE";
    /// Separator between nested keys in environment overrides
    pub const ENV_SEPARATOR: &str = "__";
}
