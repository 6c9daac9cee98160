//! Configuration schema for picobridge.toml.

use crate::registry::DuplicatePolicy;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Board identity reported by `status` and `system_info`.
    pub board_name: String,

    /// Serial device the bridge serves on.
    pub serial_device: String,

    /// Serial baud rate.
    pub baud_rate: u32,

    /// Maximum accumulated bytes per frame before the framer gives up.
    pub max_frame_bytes: usize,

    /// Bounded transport poll interval in milliseconds. The loop never
    /// blocks longer than this waiting for bytes.
    pub poll_interval_ms: u64,

    /// What `register` does when a tool name already exists.
    pub duplicate_policy: DuplicatePolicy,

    /// ADC reference voltage used by `adc_read_voltage`.
    pub adc_vref: f64,

    /// Upper bound on a single I2C/SPI transfer, keeping one small frame
    /// from requesting an arbitrarily large payload.
    pub max_transfer_bytes: usize,

    /// Upper bound for the `delay` tool, keeping handlers inside the
    /// dispatch time budget.
    pub max_delay_ms: u64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            board_name: "pico-sim".into(),
            serial_device: "/dev/ttyACM0".into(),
            baud_rate: 115_200,
            max_frame_bytes: 1024,
            poll_interval_ms: 20,
            duplicate_policy: DuplicatePolicy::Reject,
            adc_vref: 3.3,
            max_transfer_bytes: 256,
            max_delay_ms: 50,
            log_level: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }
}
