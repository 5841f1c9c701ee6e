//! JSON codec. The value is written as-is; object keys come out sorted.

use marshaller_core::{formats, ContentVariable, MarshallerError, Result};
use serde_json::Value;

use crate::Codec;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format_id(&self) -> &'static str {
        formats::JSON
    }

    fn marshal(&self, value: &Value, _schema: &ContentVariable) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn unmarshal(&self, wire: &str, schema: &ContentVariable) -> Result<Value> {
        serde_json::from_str(wire).map_err(|e| {
            MarshallerError::Codec(format!("invalid json for '{}': {}", schema.name, e))
        })
    }
}
