//! Services, protocols and device types.

use serde::{Deserialize, Serialize};

use super::content::ContentVariable;
use crate::error::{MarshallerError, Result};

/// One wire message part of a service input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "content_variable")]
    pub root: ContentVariable,
    pub serialization: String,
    pub protocol_segment_id: String,
}

impl Content {
    pub fn new(
        root: ContentVariable,
        serialization: impl Into<String>,
        protocol_segment_id: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            root,
            serialization: serialization.into(),
            protocol_segment_id: protocol_segment_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub local_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub protocol_id: String,
    #[serde(default)]
    pub inputs: Vec<Content>,
    #[serde(default)]
    pub outputs: Vec<Content>,
}

impl Service {
    pub fn new(id: impl Into<String>, protocol_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            local_id: String::new(),
            name: String::new(),
            protocol_id: protocol_id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, content: Content) -> Self {
        self.inputs.push(content);
        self
    }

    pub fn with_output(mut self, content: Content) -> Self {
        self.outputs.push(content);
        self
    }
}

/// Named wire channel of a protocol (e.g. "body", "header").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSegment {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub protocol_segments: Vec<ProtocolSegment>,
}

impl Protocol {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            handler: String::new(),
            protocol_segments: Vec::new(),
        }
    }

    pub fn with_segment(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.protocol_segments.push(ProtocolSegment {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    /// Name of the segment with the given id.
    pub fn segment_name(&self, segment_id: &str) -> Result<&str> {
        self.protocol_segments
            .iter()
            .find(|s| s.id == segment_id)
            .map(|s| s.name.as_str())
            .ok_or_else(|| {
                MarshallerError::Validation(format!(
                    "protocol '{}' has no segment '{}'",
                    self.id, segment_id
                ))
            })
    }

    /// Check that `service` was declared for this protocol.
    pub fn check_service(&self, service: &Service) -> Result<()> {
        if !service.protocol_id.is_empty() && service.protocol_id != self.id {
            return Err(MarshallerError::Validation(format!(
                "service '{}' uses protocol '{}', not '{}'",
                service.id, service.protocol_id, self.id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub services: Vec<Service>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_lookup() {
        let protocol = Protocol::new("p").with_segment("seg-body", "body");
        assert_eq!(protocol.segment_name("seg-body").unwrap(), "body");
        assert!(matches!(
            protocol.segment_name("seg-header"),
            Err(MarshallerError::Validation(_))
        ));
    }

    #[test]
    fn test_service_protocol_mismatch() {
        let protocol = Protocol::new("p");
        assert!(protocol.check_service(&Service::new("s", "p")).is_ok());
        assert!(protocol.check_service(&Service::new("s", "q")).is_err());
    }
}
