//! Built-in hardware-control tools.
//!
//! Each tool declares its exact parameter schema so the dispatcher can
//! validate before anything hardware-mutating runs, and a handler that
//! talks to the board through the capability trait only.

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::hardware::{Board, HardwareError};
use crate::registry::{Params, ToolDescriptor, ToolRegistry};
use crate::types::{ParamSpec, ParamType, PinMode};
use serde_json::{json, Value};
use std::time::Instant;

/// Everything a handler may touch during one invocation.
pub struct ToolContext<'a> {
    pub board: &'a mut dyn Board,
    pub config: &'a BridgeConfig,
    /// Process start, for uptime reporting.
    pub started: Instant,
}

/// Register the builtin tool set. Called once on an empty registry.
pub fn register_builtins(registry: &mut ToolRegistry) -> Result<(), BridgeError> {
    use ParamType::*;

    let builtins: Vec<ToolDescriptor> = vec![
        // GPIO
        ToolDescriptor::builtin(
            "gpio_mode",
            vec![
                ParamSpec::required("pin", Int),
                ParamSpec::optional("mode", Str, json!("output")),
            ],
            execute_gpio_mode,
        ),
        ToolDescriptor::builtin(
            "gpio_write",
            vec![
                ParamSpec::required("pin", Int),
                ParamSpec::required("value", Int),
            ],
            execute_gpio_write,
        ),
        ToolDescriptor::builtin(
            "gpio_read",
            vec![ParamSpec::required("pin", Int)],
            execute_gpio_read,
        ),
        // PWM
        ToolDescriptor::builtin(
            "pwm_start",
            vec![
                ParamSpec::required("pin", Int),
                ParamSpec::optional("frequency", Int, json!(1000)),
                ParamSpec::optional("duty", Float, json!(0.5)),
            ],
            execute_pwm_start,
        ),
        ToolDescriptor::builtin(
            "pwm_stop",
            vec![ParamSpec::required("pin", Int)],
            execute_pwm_stop,
        ),
        ToolDescriptor::builtin(
            "pwm_duty",
            vec![
                ParamSpec::required("pin", Int),
                ParamSpec::required("duty", Float),
            ],
            execute_pwm_duty,
        ),
        // ADC
        ToolDescriptor::builtin(
            "adc_read",
            vec![ParamSpec::optional("channel", Int, json!(0))],
            execute_adc_read,
        ),
        ToolDescriptor::builtin(
            "adc_read_voltage",
            vec![ParamSpec::optional("channel", Int, json!(0))],
            execute_adc_read_voltage,
        ),
        // I2C
        ToolDescriptor::builtin(
            "i2c_scan",
            vec![
                ParamSpec::optional("scl", Int, json!(5)),
                ParamSpec::optional("sda", Int, json!(4)),
                ParamSpec::optional("frequency", Int, json!(400_000)),
            ],
            execute_i2c_scan,
        ),
        ToolDescriptor::builtin(
            "i2c_read",
            vec![
                ParamSpec::required("address", Int),
                ParamSpec::optional("register", Int, json!(0)),
                ParamSpec::optional("length", Int, json!(1)),
            ],
            execute_i2c_read,
        ),
        ToolDescriptor::builtin(
            "i2c_write",
            vec![
                ParamSpec::required("address", Int),
                ParamSpec::optional("register", Int, json!(0)),
                ParamSpec::required("data", Bytes),
            ],
            execute_i2c_write,
        ),
        // SPI
        ToolDescriptor::builtin(
            "spi_read",
            vec![
                ParamSpec::optional("length", Int, json!(1)),
                ParamSpec::optional("frequency", Int, json!(1_000_000)),
            ],
            execute_spi_read,
        ),
        ToolDescriptor::builtin(
            "spi_write",
            vec![
                ParamSpec::required("data", Bytes),
                ParamSpec::optional("frequency", Int, json!(1_000_000)),
            ],
            execute_spi_write,
        ),
        // System
        ToolDescriptor::builtin("system_info", vec![], execute_system_info),
        ToolDescriptor::builtin("system_reset", vec![], execute_system_reset),
        ToolDescriptor::builtin("get_time", vec![], execute_get_time),
        ToolDescriptor::builtin(
            "delay",
            vec![ParamSpec::optional("milliseconds", Int, json!(0))],
            execute_delay,
        ),
    ];

    for descriptor in builtins {
        registry.register(descriptor)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GPIO
// ---------------------------------------------------------------------------

fn execute_gpio_mode(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let pin = params.u8_value("pin")?;
    let mode_str = params.str_value("mode")?;
    let mode = PinMode::parse(mode_str).ok_or_else(|| {
        BridgeError::InvalidParams(format!(
            "parameter 'mode' must be \"input\" or \"output\", got \"{mode_str}\""
        ))
    })?;
    ctx.board.pin_mode(pin, mode)?;
    Ok(json!({"pin": pin, "mode": mode.to_string()}))
}

fn execute_gpio_write(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let pin = params.u8_value("pin")?;
    let value = params.i64_value("value")?;
    ctx.board.digital_write(pin, (value != 0) as u8)?;
    Ok(json!({"pin": pin, "value": value}))
}

fn execute_gpio_read(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let pin = params.u8_value("pin")?;
    let value = ctx.board.digital_read(pin)?;
    Ok(json!({"pin": pin, "value": value}))
}

// ---------------------------------------------------------------------------
// PWM
// ---------------------------------------------------------------------------

fn execute_pwm_start(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let pin = params.u8_value("pin")?;
    let frequency = params.u32_value("frequency")?;
    let duty = params.f64_value("duty")?;
    ctx.board.pwm_start(pin, frequency, duty)?;
    Ok(json!({"pin": pin, "frequency": frequency, "duty": duty}))
}

fn execute_pwm_stop(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let pin = params.u8_value("pin")?;
    ctx.board.pwm_stop(pin)?;
    Ok(json!({"pin": pin, "stopped": true}))
}

fn execute_pwm_duty(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let pin = params.u8_value("pin")?;
    let duty = params.f64_value("duty")?;
    ctx.board.pwm_duty(pin, duty)?;
    Ok(json!({"pin": pin, "duty": duty}))
}

// ---------------------------------------------------------------------------
// ADC
// ---------------------------------------------------------------------------

fn execute_adc_read(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let channel = params.u8_value("channel")?;
    let raw = ctx.board.adc_read(channel)?;
    Ok(json!({"channel": channel, "raw": raw}))
}

fn execute_adc_read_voltage(
    ctx: &mut ToolContext<'_>,
    params: &Params,
) -> Result<Value, BridgeError> {
    let channel = params.u8_value("channel")?;
    let raw = ctx.board.adc_read(channel)?;
    let voltage = (raw as f64 / u16::MAX as f64) * ctx.config.adc_vref;
    let voltage = (voltage * 1000.0).round() / 1000.0;
    Ok(json!({"channel": channel, "voltage": voltage}))
}

// ---------------------------------------------------------------------------
// I2C
// ---------------------------------------------------------------------------

fn execute_i2c_scan(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let scl = params.u8_value("scl")?;
    let sda = params.u8_value("sda")?;
    let frequency = params.u32_value("frequency")?;
    let devices = ctx.board.i2c_scan(scl, sda, frequency)?;
    let hex: Vec<String> = devices.iter().map(|a| format!("0x{a:02x}")).collect();
    Ok(json!({"devices": hex, "count": hex.len()}))
}

fn execute_i2c_read(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let address = params.u8_value("address")?;
    let register = params.u8_value("register")?;
    let length = transfer_length(ctx, params)?;
    let data = ctx.board.i2c_read(address, register, length)?;
    Ok(json!({"address": format!("0x{address:02x}"), "data": data}))
}

fn execute_i2c_write(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let address = params.u8_value("address")?;
    let register = params.u8_value("register")?;
    let data = params.bytes_value("data")?;
    let written = ctx.board.i2c_write(address, register, &data)?;
    Ok(json!({"address": format!("0x{address:02x}"), "written": written}))
}

// ---------------------------------------------------------------------------
// SPI
// ---------------------------------------------------------------------------

fn execute_spi_read(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let length = transfer_length(ctx, params)?;
    let frequency = params.u32_value("frequency")?;
    let data = ctx.board.spi_read(length, frequency)?;
    Ok(json!({"data": data}))
}

fn execute_spi_write(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let data = params.bytes_value("data")?;
    let frequency = params.u32_value("frequency")?;
    let written = ctx.board.spi_write(&data, frequency)?;
    Ok(json!({"written": written}))
}

/// A `length` parameter, bounded by the configured transfer limit. The
/// bound is checked before any bus call so no handler can be talked into
/// an arbitrarily large allocation.
fn transfer_length(ctx: &ToolContext<'_>, params: &Params) -> Result<usize, BridgeError> {
    let length = params.usize_value("length")?;
    let max = ctx.config.max_transfer_bytes;
    if length > max {
        return Err(BridgeError::Hardware(HardwareError::OutOfRange {
            what: "length",
            value: length as i64,
            max: max as i64,
        }));
    }
    Ok(length)
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

fn execute_system_info(ctx: &mut ToolContext<'_>, _params: &Params) -> Result<Value, BridgeError> {
    let info = ctx.board.info();
    let mut value = serde_json::to_value(&info).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert(
            "uptime_ms".into(),
            json!(ctx.started.elapsed().as_millis() as u64),
        );
    }
    Ok(value)
}

fn execute_system_reset(ctx: &mut ToolContext<'_>, _params: &Params) -> Result<Value, BridgeError> {
    ctx.board.reset()?;
    Ok(json!({"reset": true}))
}

fn execute_get_time(ctx: &mut ToolContext<'_>, _params: &Params) -> Result<Value, BridgeError> {
    let elapsed = ctx.started.elapsed();
    Ok(json!({
        "time_ms": elapsed.as_millis() as u64,
        "time_us": elapsed.as_micros() as u64,
    }))
}

fn execute_delay(ctx: &mut ToolContext<'_>, params: &Params) -> Result<Value, BridgeError> {
    let requested = params.u32_value("milliseconds")? as u64;
    // Clamped so a single request cannot stall the transport.
    let clamped = requested.min(ctx.config.max_delay_ms);
    std::thread::sleep(std::time::Duration::from_millis(clamped));
    Ok(json!({"delayed_ms": clamped}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::SimBoard;
    use crate::registry::DuplicatePolicy;
    use crate::types::ErrorCode;
    use std::collections::HashMap;

    fn call(board: &mut SimBoard, tool: &str, supplied: Value) -> Result<Value, BridgeError> {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject);
        register_builtins(&mut registry).unwrap();
        let descriptor = registry.lookup(tool).expect("builtin registered");
        let supplied = supplied.as_object().cloned().unwrap_or_default();
        let params = descriptor.validate(&supplied)?;
        let config = BridgeConfig::default();
        let mut ctx = ToolContext {
            board,
            config: &config,
            started: Instant::now(),
        };
        (descriptor.handler)(&mut ctx, &params)
    }

    #[test]
    fn gpio_write_echoes_pin_and_value() {
        let mut board = SimBoard::new("sim");
        let result = call(&mut board, "gpio_write", json!({"pin": 25, "value": 1})).unwrap();
        assert_eq!(result, json!({"pin": 25, "value": 1}));
    }

    #[test]
    fn gpio_mode_rejects_bad_direction() {
        let mut board = SimBoard::new("sim");
        let err = call(&mut board, "gpio_mode", json!({"pin": 2, "mode": "sideways"}))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParams);
    }

    #[test]
    fn gpio_pin_past_u8_is_out_of_range() {
        let mut board = SimBoard::new("sim");
        let err = call(&mut board, "gpio_write", json!({"pin": 500, "value": 1})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfRange);
    }

    #[test]
    fn pwm_start_uses_documented_defaults() {
        let mut board = SimBoard::new("sim");
        let result = call(&mut board, "pwm_start", json!({"pin": 10})).unwrap();
        assert_eq!(result, json!({"pin": 10, "frequency": 1000, "duty": 0.5}));
    }

    #[test]
    fn adc_voltage_scales_against_vref() {
        let mut board = SimBoard::new("sim");
        board.set_adc_raw(0, u16::MAX);
        let result = call(&mut board, "adc_read_voltage", json!({"channel": 0})).unwrap();
        assert_eq!(result["voltage"], json!(3.3));

        board.set_adc_raw(1, 0);
        let result = call(&mut board, "adc_read_voltage", json!({"channel": 1})).unwrap();
        assert_eq!(result["voltage"], json!(0.0));
    }

    #[test]
    fn i2c_scan_reports_hex_addresses() {
        let mut board = SimBoard::new("sim");
        board.attach_i2c_device(0x3c, HashMap::new());
        board.attach_i2c_device(0x68, HashMap::new());
        let result = call(&mut board, "i2c_scan", json!({})).unwrap();
        assert_eq!(result, json!({"devices": ["0x3c", "0x68"], "count": 2}));
    }

    #[test]
    fn i2c_read_missing_device_is_bus_timeout() {
        let mut board = SimBoard::new("sim");
        let err = call(&mut board, "i2c_read", json!({"address": 0x3c})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BusTimeout);
    }

    #[test]
    fn i2c_write_then_read_round_trips() {
        let mut board = SimBoard::new("sim");
        board.attach_i2c_device(0x50, HashMap::new());
        let written = call(
            &mut board,
            "i2c_write",
            json!({"address": 0x50, "register": 0x10, "data": [171, 205]}),
        )
        .unwrap();
        assert_eq!(written["written"], json!(2));
        let read = call(
            &mut board,
            "i2c_read",
            json!({"address": 0x50, "register": 0x10, "length": 2}),
        )
        .unwrap();
        assert_eq!(read["data"], json!([171, 205]));
    }

    #[test]
    fn i2c_read_length_is_bounded() {
        let mut board = SimBoard::new("sim");
        board.attach_i2c_device(0x50, HashMap::new());
        // A 50-byte frame must not be able to request a 50 MB payload.
        let err = call(
            &mut board,
            "i2c_read",
            json!({"address": 0x50, "length": 50_000_000}),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfRange);

        let max = BridgeConfig::default().max_transfer_bytes;
        let result = call(
            &mut board,
            "i2c_read",
            json!({"address": 0x50, "length": max}),
        )
        .unwrap();
        assert_eq!(result["data"].as_array().unwrap().len(), max);
    }

    #[test]
    fn spi_read_length_is_bounded() {
        let mut board = SimBoard::new("sim");
        let err = call(&mut board, "spi_read", json!({"length": 50_000_000})).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OutOfRange);
        assert!(call(&mut board, "spi_read", json!({"length": 8})).is_ok());
    }

    #[test]
    fn spi_write_reports_byte_count() {
        let mut board = SimBoard::new("sim");
        let result = call(&mut board, "spi_write", json!({"data": [1, 2, 3]})).unwrap();
        assert_eq!(result, json!({"written": 3}));
    }

    #[test]
    fn system_info_includes_identity_and_uptime() {
        let mut board = SimBoard::new("pico-sim");
        let result = call(&mut board, "system_info", json!({})).unwrap();
        assert_eq!(result["board"], "pico-sim");
        assert!(result.get("uptime_ms").is_some());
        assert!(result.get("mem_free").is_some());
    }

    #[test]
    fn delay_is_clamped_to_configured_maximum() {
        let mut board = SimBoard::new("sim");
        let result = call(&mut board, "delay", json!({"milliseconds": 600000})).unwrap();
        let delayed = result["delayed_ms"].as_u64().unwrap();
        assert_eq!(delayed, BridgeConfig::default().max_delay_ms);
    }

    #[test]
    fn system_reset_clears_pin_state() {
        let mut board = SimBoard::new("sim");
        call(&mut board, "gpio_write", json!({"pin": 25, "value": 1})).unwrap();
        call(&mut board, "system_reset", json!({})).unwrap();
        let read = call(&mut board, "gpio_read", json!({"pin": 25})).unwrap();
        assert_eq!(read["value"], json!(0));
    }
}
