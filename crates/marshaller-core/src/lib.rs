//! Core types for the semantic marshaller.
//!
//! This crate defines the schema variant model shared by characteristic and
//! content-variable trees, the error taxonomy, and configuration. The mapping
//! engine itself lives in `marshaller-mapping`.

pub mod config;
pub mod error;
pub mod model;
pub mod value;

pub use config::{MarshallerConfig, MissingPathPolicy};
pub use error::{MarshallerError, Result};
pub use model::{
    AspectNode, Characteristic, Concept, Configurable, ConfigurableValue, Container, Content,
    ContentVariable, ConverterExtension, DeviceType, Function, Kind, PrimitiveType, Protocol,
    ProtocolSegment, SchemaNode, Service, PLACEHOLDER, XML_ATTRIBUTE,
};

/// Serialization format ids understood by the default codec registry.
pub mod formats {
    pub const JSON: &str = "json";
    pub const XML: &str = "xml";
    pub const PLAIN_TEXT: &str = "plain-text";
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
