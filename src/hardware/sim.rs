//! In-memory board simulator.
//!
//! Models an RP2040-class board closely enough for the dispatch core and
//! its tests: 30 GPIOs, 4 ADC channels, per-call I2C bus with a register
//! map per attached device, and a loopback SPI FIFO.

use super::{Board, HardwareError};
use crate::types::{BoardInfo, PinMode};
use std::collections::HashMap;

/// Highest valid GPIO number (RP2040 exposes GPIO0..=29).
pub const MAX_GPIO: u8 = 29;
/// Highest valid ADC channel.
pub const MAX_ADC_CHANNEL: u8 = 3;

#[derive(Debug, Clone, Copy)]
struct PinState {
    mode: PinMode,
    level: u8,
}

#[derive(Debug, Clone, Copy)]
struct PwmState {
    frequency: u32,
    duty: f64,
}

/// Simulated board state. Single-owner; the dispatcher holds it behind
/// `Box<dyn Board>` for the lifetime of the process.
pub struct SimBoard {
    name: String,
    pins: HashMap<u8, PinState>,
    pwm: HashMap<u8, PwmState>,
    adc: [u16; 4],
    /// Attached I2C devices: address -> register map.
    i2c_devices: HashMap<u8, HashMap<u8, u8>>,
    /// Loopback FIFO: writes land here, reads drain it (0xFF when idle).
    spi_fifo: Vec<u8>,
}

impl SimBoard {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pins: HashMap::new(),
            pwm: HashMap::new(),
            // Mid-scale readings so adc tools return something plausible.
            adc: [0x8000; 4],
            i2c_devices: HashMap::new(),
            spi_fifo: Vec::new(),
        }
    }

    fn check_pin(pin: u8) -> Result<(), HardwareError> {
        if pin > MAX_GPIO {
            return Err(HardwareError::OutOfRange {
                what: "pin",
                value: pin as i64,
                max: MAX_GPIO as i64,
            });
        }
        Ok(())
    }

    // -- test / emulation hooks ---------------------------------------------

    /// Force a pin level, as if driven externally.
    pub fn set_pin_level(&mut self, pin: u8, level: u8) {
        self.pins.insert(
            pin,
            PinState {
                mode: PinMode::Input,
                level: (level != 0) as u8,
            },
        );
    }

    /// Set the raw count a channel will report.
    pub fn set_adc_raw(&mut self, channel: u8, raw: u16) {
        if let Some(slot) = self.adc.get_mut(channel as usize) {
            *slot = raw;
        }
    }

    /// Attach a simulated I2C device with the given register map.
    pub fn attach_i2c_device(&mut self, address: u8, registers: HashMap<u8, u8>) {
        self.i2c_devices.insert(address, registers);
    }

    /// Register value of an attached device, if any.
    pub fn i2c_register(&self, address: u8, register: u8) -> Option<u8> {
        self.i2c_devices.get(&address)?.get(&register).copied()
    }
}

impl Board for SimBoard {
    fn pin_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), HardwareError> {
        Self::check_pin(pin)?;
        let entry = self.pins.entry(pin).or_insert(PinState {
            mode,
            level: 0,
        });
        entry.mode = mode;
        Ok(())
    }

    fn digital_write(&mut self, pin: u8, value: u8) -> Result<(), HardwareError> {
        Self::check_pin(pin)?;
        self.pins.insert(
            pin,
            PinState {
                mode: PinMode::Output,
                level: (value != 0) as u8,
            },
        );
        Ok(())
    }

    fn digital_read(&mut self, pin: u8) -> Result<u8, HardwareError> {
        Self::check_pin(pin)?;
        // Unconfigured pins read low, matching a pull-down default.
        Ok(self.pins.get(&pin).map(|p| p.level).unwrap_or(0))
    }

    fn pwm_start(&mut self, pin: u8, frequency: u32, duty: f64) -> Result<(), HardwareError> {
        Self::check_pin(pin)?;
        check_duty(duty)?;
        self.pwm.insert(pin, PwmState { frequency, duty });
        Ok(())
    }

    fn pwm_stop(&mut self, pin: u8) -> Result<(), HardwareError> {
        Self::check_pin(pin)?;
        self.pwm.remove(&pin);
        Ok(())
    }

    fn pwm_duty(&mut self, pin: u8, duty: f64) -> Result<(), HardwareError> {
        Self::check_pin(pin)?;
        check_duty(duty)?;
        match self.pwm.get_mut(&pin) {
            Some(state) => {
                state.duty = duty;
                Ok(())
            }
            None => Err(HardwareError::Fault(format!(
                "pwm not running on pin {pin}"
            ))),
        }
    }

    fn adc_read(&mut self, channel: u8) -> Result<u16, HardwareError> {
        if channel > MAX_ADC_CHANNEL {
            return Err(HardwareError::OutOfRange {
                what: "channel",
                value: channel as i64,
                max: MAX_ADC_CHANNEL as i64,
            });
        }
        Ok(self.adc[channel as usize])
    }

    fn i2c_scan(&mut self, scl: u8, sda: u8, _frequency: u32) -> Result<Vec<u8>, HardwareError> {
        Self::check_pin(scl)?;
        Self::check_pin(sda)?;
        let mut addresses: Vec<u8> = self.i2c_devices.keys().copied().collect();
        addresses.sort_unstable();
        Ok(addresses)
    }

    fn i2c_read(
        &mut self,
        address: u8,
        register: u8,
        length: usize,
    ) -> Result<Vec<u8>, HardwareError> {
        let device = self.i2c_devices.get(&address).ok_or_else(|| {
            HardwareError::BusTimeout(format!("no ack from i2c address 0x{address:02x}"))
        })?;
        Ok((0..length)
            .map(|i| {
                let reg = register.wrapping_add(i as u8);
                device.get(&reg).copied().unwrap_or(0)
            })
            .collect())
    }

    fn i2c_write(
        &mut self,
        address: u8,
        register: u8,
        data: &[u8],
    ) -> Result<usize, HardwareError> {
        let device = self.i2c_devices.get_mut(&address).ok_or_else(|| {
            HardwareError::BusTimeout(format!("no ack from i2c address 0x{address:02x}"))
        })?;
        for (i, &byte) in data.iter().enumerate() {
            device.insert(register.wrapping_add(i as u8), byte);
        }
        Ok(data.len())
    }

    fn spi_read(&mut self, length: usize, _frequency: u32) -> Result<Vec<u8>, HardwareError> {
        let available = self.spi_fifo.len().min(length);
        let mut out: Vec<u8> = self.spi_fifo.drain(..available).collect();
        // An idle MISO line reads high.
        out.resize(length, 0xFF);
        Ok(out)
    }

    fn spi_write(&mut self, data: &[u8], _frequency: u32) -> Result<usize, HardwareError> {
        self.spi_fifo.extend_from_slice(data);
        Ok(data.len())
    }

    fn info(&self) -> BoardInfo {
        BoardInfo {
            board: self.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            frequency: 125_000_000,
            mem_free: Some(192 * 1024),
        }
    }

    fn reset(&mut self) -> Result<(), HardwareError> {
        self.pins.clear();
        self.pwm.clear();
        self.adc = [0x8000; 4];
        self.spi_fifo.clear();
        Ok(())
    }
}

fn check_duty(duty: f64) -> Result<(), HardwareError> {
    if !(0.0..=1.0).contains(&duty) {
        return Err(HardwareError::OutOfRange {
            what: "duty",
            value: (duty * 100.0) as i64,
            max: 100,
        });
    }
    Ok(())
}
