//! In-memory registry for tests and offline runs.

use async_trait::async_trait;
use marshaller_core::{
    AspectNode, Characteristic, Concept, DeviceType, Function, MarshallerError, Protocol, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::client::RegistryClient;

/// Registry content held in memory. Deserialises from a JSON dump with the
/// same field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryRegistry {
    pub concepts: Vec<Concept>,
    pub characteristics: Vec<Characteristic>,
    pub functions: Vec<Function>,
    pub aspect_nodes: Vec<AspectNode>,
    pub device_types: Vec<DeviceType>,
    pub protocols: Vec<Protocol>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry dump from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MarshallerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            MarshallerError::Config(format!("invalid registry file {}: {}", path.display(), e))
        })
    }

    pub fn with_concept(mut self, concept: Concept) -> Self {
        self.concepts.push(concept);
        self
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_aspect_node(mut self, aspect: AspectNode) -> Self {
        self.aspect_nodes.push(aspect);
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_types.push(device_type);
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocols.push(protocol);
        self
    }

    pub fn merge(mut self, other: InMemoryRegistry) -> Self {
        self.concepts.extend(other.concepts);
        self.characteristics.extend(other.characteristics);
        self.functions.extend(other.functions);
        self.aspect_nodes.extend(other.aspect_nodes);
        self.device_types.extend(other.device_types);
        self.protocols.extend(other.protocols);
        self
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn list_concept_ids(&self) -> Result<Vec<String>> {
        Ok(self.concepts.iter().map(|c| c.id.clone()).collect())
    }

    async fn fetch_concept(&self, id: &str) -> Result<Concept> {
        self.concepts
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| MarshallerError::not_found("concept", id))
    }

    async fn fetch_characteristic(&self, id: &str) -> Result<Characteristic> {
        self.characteristics
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| MarshallerError::not_found("characteristic", id))
    }

    async fn list_functions(&self) -> Result<Vec<Function>> {
        Ok(self.functions.clone())
    }

    async fn list_aspect_nodes(&self) -> Result<Vec<AspectNode>> {
        Ok(self.aspect_nodes.clone())
    }

    async fn fetch_device_type(&self, id: &str) -> Result<DeviceType> {
        self.device_types
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| MarshallerError::not_found("device type", id))
    }

    async fn fetch_protocol(&self, id: &str) -> Result<Protocol> {
        self.protocols
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| MarshallerError::not_found("protocol", id))
    }
}
