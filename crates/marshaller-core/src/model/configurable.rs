//! Configurables: concepts every given service accepts as extra input.

use serde::{Deserialize, Serialize};

/// A characteristic together with its flattened, user-editable defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configurable {
    pub characteristic_id: String,
    pub values: Vec<ConfigurableValue>,
}

/// One leaf of a configurable characteristic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurableValue {
    /// Dotted path relative to the characteristic root; empty for a
    /// primitive characteristic.
    pub path: String,
    pub label: String,
    /// Scalar rendered as text.
    pub value: String,
}

impl ConfigurableValue {
    pub fn new(
        path: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}
