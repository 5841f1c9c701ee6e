//! Error taxonomy shared by every marshaller crate.
//!
//! All mapping, casting and (un)marshalling operations return
//! [`MarshallerError`]. Nothing inside the core retries; the error aborts the
//! single call that raised it and is surfaced to the caller unchanged.

/// Result type used across the marshaller crates.
pub type Result<T> = std::result::Result<T, MarshallerError>;

/// Errors produced by the semantic mapping engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshallerError {
    /// Unknown concept, characteristic, function, aspect, device type or path.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Ambiguous or missing characteristic binding, or a service/protocol
    /// cross-reference that does not line up.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A runtime value does not have the shape its schema declares.
    #[error("Type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// No codec is registered under the requested serialization format id.
    #[error("Unsupported serialization format: {0}")]
    UnsupportedFormat(String),

    /// Concept or characteristic lookup failed while casting, or no cast
    /// function is registered for the requested pair.
    #[error("Cast error: {0}")]
    Cast(String),

    /// Wire data could not be encoded or decoded by a codec.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Transport or protocol failure talking to the device/concept registry.
    #[error("Registry error: {0}")]
    Registry(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MarshallerError {
    /// Create a [`MarshallerError::NotFound`] for the given entity kind.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a [`MarshallerError::NotFound`] for a dotted path.
    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::not_found("path", path)
    }

    /// Create a [`MarshallerError::TypeMismatch`] describing `actual` by its JSON type name.
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: &serde_json::Value,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: json_type_name(actual).to_string(),
        }
    }

    /// Whether this error means something was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for MarshallerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}

/// Human readable JSON type name, used in type mismatch messages.
pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "structure",
    }
}
