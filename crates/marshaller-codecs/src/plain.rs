//! Plain-text codec for primitive contents.

use marshaller_core::value::{parse_scalar, render_scalar};
use marshaller_core::{formats, ContentVariable, Kind, MarshallerError, PrimitiveType, Result};
use serde_json::Value;

use crate::Codec;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextCodec;

fn primitive_of(schema: &ContentVariable) -> Result<PrimitiveType> {
    match &schema.kind {
        Kind::Primitive(p) => Ok(*p),
        other => Err(MarshallerError::Codec(format!(
            "plain-text content '{}' must be primitive, got {}",
            schema.name,
            other.label()
        ))),
    }
}

impl Codec for PlainTextCodec {
    fn format_id(&self) -> &'static str {
        formats::PLAIN_TEXT
    }

    fn marshal(&self, value: &Value, schema: &ContentVariable) -> Result<String> {
        primitive_of(schema)?;
        match value {
            Value::Array(_) | Value::Object(_) => Err(MarshallerError::Codec(format!(
                "plain-text content '{}' cannot hold a container",
                schema.name
            ))),
            scalar => Ok(render_scalar(scalar)),
        }
    }

    fn unmarshal(&self, wire: &str, schema: &ContentVariable) -> Result<Value> {
        parse_scalar(wire, primitive_of(schema)?)
    }
}
