//! Concepts the marshaller ships cast functions for.
//!
//! A registry that wants the in-process casts declares these concept and
//! characteristic ids.

pub mod ids {
    pub const TEMPERATURE: &str = "example-temperature";
    pub const CELSIUS: &str = "example-celsius";
    pub const KELVIN: &str = "example-kelvin";
    pub const FAHRENHEIT: &str = "example-fahrenheit";

    pub const COLOR: &str = "example-color";
    pub const RGB: &str = "example-rgb";
    pub const RGB_R: &str = "example-rgb.r";
    pub const RGB_G: &str = "example-rgb.g";
    pub const RGB_B: &str = "example-rgb.b";
    pub const HEX: &str = "example-hex";

    pub const ON_OFF: &str = "example-on-off";
    pub const BOOLEAN: &str = "example-boolean";
    /// "on" / "off" text.
    pub const BINARY_STATE: &str = "example-binary-state";
    /// 1 / 0 integer code.
    pub const BINARY_CODE: &str = "example-binary-code";
}
