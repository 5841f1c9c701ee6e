//! Concepts, converter extensions and functions.

use serde::{Deserialize, Serialize};

/// RDF types distinguishing measuring from controlling functions.
pub mod function_type {
    pub const MEASURING: &str = "https://senergy.infai.org/ontology/MeasuringFunction";
    pub const CONTROLLING: &str = "https://senergy.infai.org/ontology/ControllingFunction";
}

/// Group of mutually convertible characteristics (e.g. "temperature").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Ids of the top-level member characteristics, in order.
    #[serde(default)]
    pub characteristic_ids: Vec<String>,
    /// Canonical characteristic the concept's casts pivot through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_characteristic_id: Option<String>,
    /// Custom conversions, used when a matched function asks for them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversions: Vec<ConverterExtension>,
}

impl Concept {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            characteristic_ids: Vec::new(),
            base_characteristic_id: None,
            conversions: Vec::new(),
        }
    }

    pub fn with_characteristic(mut self, id: impl Into<String>) -> Self {
        self.characteristic_ids.push(id.into());
        self
    }

    pub fn with_base(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.characteristic_ids.contains(&id) {
            self.characteristic_ids.push(id.clone());
        }
        self.base_characteristic_id = Some(id);
        self
    }

    pub fn with_conversion(mut self, conversion: ConverterExtension) -> Self {
        self.conversions.push(conversion);
        self
    }
}

fn default_placeholder() -> String {
    "x".to_string()
}

/// One custom conversion step between two characteristics of a concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterExtension {
    pub from: String,
    pub to: String,
    /// Arithmetic expression over the placeholder variable.
    pub formula: String,
    /// Ordering hint when several chains reach the same target.
    #[serde(default)]
    pub distance: i64,
    #[serde(default = "default_placeholder")]
    pub placeholder_name: String,
}

impl ConverterExtension {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        formula: impl Into<String>,
        distance: i64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            formula: formula.into(),
            distance,
            placeholder_name: default_placeholder(),
        }
    }
}

/// Semantic operation tag (e.g. "getTemperature") linking a concept to paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<String>,
    #[serde(default)]
    pub rdf_type: String,
}

impl Function {
    pub fn measuring(
        id: impl Into<String>,
        name: impl Into<String>,
        concept_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            concept_id: Some(concept_id.into()),
            rdf_type: function_type::MEASURING.to_string(),
        }
    }

    pub fn controlling(
        id: impl Into<String>,
        name: impl Into<String>,
        concept_id: impl Into<String>,
    ) -> Self {
        Self {
            rdf_type: function_type::CONTROLLING.to_string(),
            ..Self::measuring(id, name, concept_id)
        }
    }

    /// Controlling functions address service inputs, everything else outputs.
    pub fn is_controlling(&self) -> bool {
        self.rdf_type == function_type::CONTROLLING
    }
}
