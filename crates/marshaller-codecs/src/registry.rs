//! Codec lookup by serialization format id.

use marshaller_core::{MarshallerError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{Codec, JsonCodec, PlainTextCodec, XmlCodec};

/// Registry of codecs, built once and shared by every marshal call.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the JSON, XML and plain-text codecs.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_codec(Arc::new(JsonCodec));
        registry.register_codec(Arc::new(XmlCodec));
        registry.register_codec(Arc::new(PlainTextCodec));
        registry
    }

    /// Register `codec` under an explicit format id, replacing any previous one.
    pub fn register(&mut self, format_id: impl Into<String>, codec: Arc<dyn Codec>) {
        let format_id = format_id.into();
        debug!(category = "codecs", format_id = %format_id, "Registered codec");
        self.codecs.insert(format_id, codec);
    }

    /// Register `codec` under its own format id.
    pub fn register_codec(&mut self, codec: Arc<dyn Codec>) {
        self.register(codec.format_id(), codec);
    }

    pub fn get(&self, format_id: &str) -> Result<Arc<dyn Codec>> {
        self.codecs
            .get(format_id)
            .cloned()
            .ok_or_else(|| MarshallerError::UnsupportedFormat(format_id.to_string()))
    }

    /// Registered format ids, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
