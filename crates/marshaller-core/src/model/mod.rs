//! Domain model: characteristic and content schemas, concepts, services.

pub mod aspect;
pub mod characteristic;
pub mod concept;
pub mod configurable;
pub mod content;
pub mod schema;
pub mod service;

pub use aspect::AspectNode;
pub use characteristic::Characteristic;
pub use concept::{function_type, Concept, ConverterExtension, Function};
pub use configurable::{Configurable, ConfigurableValue};
pub use content::{ContentVariable, XML_ATTRIBUTE};
pub use schema::{type_uri, Container, Kind, PrimitiveType, SchemaNode, PLACEHOLDER};
pub use service::{Content, DeviceType, Protocol, ProtocolSegment, Service};
