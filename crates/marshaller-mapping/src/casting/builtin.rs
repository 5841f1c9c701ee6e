//! Cast functions for the concepts shipped in-process: temperature, color
//! and on/off.

use marshaller_concepts::builtin::ids;
use marshaller_core::value::number;
use marshaller_core::{MarshallerError, Result};
use serde_json::{json, Value};

use super::registry::CastRegistry;

const KELVIN_OFFSET: f64 = 273.15;

fn as_f64(value: &Value, what: &str) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| MarshallerError::Cast(format!("{} expects a number, got {}", what, value)))
}

fn as_str<'v>(value: &'v Value, what: &str) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| MarshallerError::Cast(format!("{} expects a string, got {}", what, value)))
}

fn as_bool(value: &Value, what: &str) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| MarshallerError::Cast(format!("{} expects a boolean, got {}", what, value)))
}

/// Parse `#rrggbb` (leading `#` optional, case-insensitive).
pub fn hex_to_rgb(value: &Value) -> Result<Value> {
    let text = as_str(value, "hex color")?;
    let digits = text.strip_prefix('#').unwrap_or(text);
    let invalid = || MarshallerError::Cast(format!("'{}' is not a #rrggbb color", text));
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
    };
    Ok(json!({
        "r": channel(0..2)?,
        "g": channel(2..4)?,
        "b": channel(4..6)?,
    }))
}

/// Format `{r, g, b}` as lowercase `#rrggbb`; channels are clamped to 0..=255.
pub fn rgb_to_hex(value: &Value) -> Result<String> {
    let channel = |name: &str| -> Result<u8> {
        let v = value
            .get(name)
            .map(|v| as_f64(v, "rgb channel"))
            .transpose()?
            .unwrap_or(0.0);
        Ok(v.round().clamp(0.0, 255.0) as u8)
    };
    Ok(format!("#{:02x}{:02x}{:02x}", channel("r")?, channel("g")?, channel("b")?))
}

fn register_temperature(registry: &mut CastRegistry) -> Result<()> {
    registry.register_concept(ids::TEMPERATURE, ids::CELSIUS);
    registry.register(
        ids::TEMPERATURE,
        ids::KELVIN,
        |v| Ok(number(as_f64(v, "kelvin")? - KELVIN_OFFSET)),
        |v| Ok(number(as_f64(v, "celsius")? + KELVIN_OFFSET)),
    )?;
    registry.register(
        ids::TEMPERATURE,
        ids::FAHRENHEIT,
        |v| Ok(number((as_f64(v, "fahrenheit")? - 32.0) * 5.0 / 9.0)),
        |v| Ok(number(as_f64(v, "celsius")? * 9.0 / 5.0 + 32.0)),
    )
}

fn register_color(registry: &mut CastRegistry) -> Result<()> {
    registry.register_concept(ids::COLOR, ids::RGB);
    registry.register(ids::COLOR, ids::HEX, hex_to_rgb, |v| {
        rgb_to_hex(v).map(Value::String)
    })
}

fn register_on_off(registry: &mut CastRegistry) -> Result<()> {
    registry.register_concept(ids::ON_OFF, ids::BOOLEAN);
    registry.register(
        ids::ON_OFF,
        ids::BINARY_STATE,
        |v| match as_str(v, "binary state")?.to_ascii_lowercase().as_str() {
            "on" => Ok(Value::Bool(true)),
            "off" => Ok(Value::Bool(false)),
            other => Err(MarshallerError::Cast(format!("'{}' is neither on nor off", other))),
        },
        |v| Ok(json!(if as_bool(v, "boolean")? { "on" } else { "off" })),
    )?;
    registry.register(
        ids::ON_OFF,
        ids::BINARY_CODE,
        |v| Ok(Value::Bool(as_f64(v, "binary code")? != 0.0)),
        |v| Ok(number(if as_bool(v, "boolean")? { 1.0 } else { 0.0 })),
    )
}

impl CastRegistry {
    /// Registry with the built-in concepts.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        register_temperature(&mut registry)?;
        register_color(&mut registry)?;
        register_on_off(&mut registry)?;
        Ok(registry)
    }
}
