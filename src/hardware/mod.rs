//! Hardware capability seam.
//!
//! Tool handlers never touch peripheral registers directly; they go through
//! the [`Board`] trait so the same dispatch core runs against real silicon
//! or the in-memory simulator used for host-side operation and tests.

pub mod sim;

pub use sim::SimBoard;

use crate::types::{BoardInfo, PinMode};
use thiserror::Error;

/// Failure classes a peripheral operation may surface. The dispatcher maps
/// these onto wire error codes; none of them may take the process down.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HardwareError {
    /// Peripheral misbehaved in a way that is not a caller mistake.
    #[error("hardware fault: {0}")]
    Fault(String),

    /// A numeric argument fell outside what the board supports.
    #[error("{what} {value} out of range (0..={max})")]
    OutOfRange {
        what: &'static str,
        value: i64,
        max: i64,
    },

    /// A bus transaction did not complete within its deadline.
    #[error("bus timeout: {0}")]
    BusTimeout(String),
}

/// The capability set the dispatcher invokes on behalf of tools.
///
/// Implementations must complete each call within a bounded time budget;
/// anything that could wait indefinitely (bus transactions in particular)
/// has to enforce its own timeout and return [`HardwareError::BusTimeout`].
pub trait Board: Send {
    fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), HardwareError>;
    fn digital_write(&mut self, pin: u8, value: u8) -> Result<(), HardwareError>;
    fn digital_read(&mut self, pin: u8) -> Result<u8, HardwareError>;

    fn pwm_start(&mut self, pin: u8, frequency: u32, duty: f64) -> Result<(), HardwareError>;
    fn pwm_stop(&mut self, pin: u8) -> Result<(), HardwareError>;
    fn pwm_duty(&mut self, pin: u8, duty: f64) -> Result<(), HardwareError>;

    /// Raw 16-bit ADC count for the given channel.
    fn adc_read(&mut self, channel: u8) -> Result<u16, HardwareError>;

    /// Scan the I2C bus wired to the given pins; returns responding addresses.
    fn i2c_scan(&mut self, scl: u8, sda: u8, frequency: u32) -> Result<Vec<u8>, HardwareError>;
    fn i2c_read(
        &mut self,
        address: u8,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, HardwareError>;
    fn i2c_write(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<usize, HardwareError>;

    fn spi_read(&mut self, length: usize, frequency: u32) -> Result<Vec<u8>, HardwareError>;
    fn spi_write(&mut self, data: &[u8], frequency: u32) -> Result<usize, HardwareError>;

    /// Board identity and health figures for `system_info` / `status`.
    fn info(&self) -> BoardInfo;

    /// Reset peripheral state. On real silicon this reboots the chip; the
    /// simulator returns everything to power-on defaults.
    fn reset(&mut self) -> Result<(), HardwareError>;
}
