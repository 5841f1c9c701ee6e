//! Wire-format codecs for the semantic marshaller.
//!
//! A [`Codec`] turns the generic nested value produced by the mapping engine
//! into a wire string and back, guided by the content's root
//! [`ContentVariable`](marshaller_core::ContentVariable). Codecs are looked
//! up by serialization format id in an explicit [`CodecRegistry`].

pub mod json;
pub mod plain;
pub mod registry;
pub mod xml;

pub use json::JsonCodec;
pub use plain::PlainTextCodec;
pub use registry::CodecRegistry;
pub use xml::XmlCodec;

use marshaller_core::{ContentVariable, Result};
use serde_json::Value;

/// One serialization format.
pub trait Codec: Send + Sync {
    /// Format id this codec is registered under by default.
    fn format_id(&self) -> &'static str;

    fn marshal(&self, value: &Value, schema: &ContentVariable) -> Result<String>;

    fn unmarshal(&self, wire: &str, schema: &ContentVariable) -> Result<Value>;
}
