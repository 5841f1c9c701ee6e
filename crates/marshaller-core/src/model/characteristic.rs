//! Characteristic schema trees.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::schema::{self, Container, Kind, PrimitiveType, SchemaNode};
use crate::error::MarshallerError;

/// Typed schema node for a semantic quantity or representation (e.g. Celsius).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCharacteristic", into = "RawCharacteristic")]
pub struct Characteristic {
    pub id: String,
    pub name: String,
    pub kind: Kind<Characteristic>,
    /// Literal default value.
    pub value: Option<Value>,
    pub display_unit: String,
}

impl Characteristic {
    pub fn primitive(
        id: impl Into<String>,
        name: impl Into<String>,
        primitive: PrimitiveType,
    ) -> Self {
        Self::with_kind(id, name, Kind::Primitive(primitive))
    }

    pub fn structure(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<Characteristic>,
    ) -> Self {
        Self::with_kind(id, name, Kind::Structure(children))
    }

    pub fn list(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<Characteristic>,
    ) -> Self {
        Self::with_kind(id, name, Kind::List(children))
    }

    pub fn variable_length(
        id: impl Into<String>,
        name: impl Into<String>,
        container: Container,
        element: Characteristic,
    ) -> Self {
        Self::with_kind(
            id,
            name,
            Kind::VariableLength {
                container,
                element: Box::new(element),
            },
        )
    }

    fn with_kind(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: Kind<Characteristic>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            value: None,
            display_unit: String::new(),
        }
    }

    /// Set the literal default value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_display_unit(mut self, unit: impl Into<String>) -> Self {
        self.display_unit = unit.into();
        self
    }

    /// Find this node or a descendant by id.
    pub fn find(&self, id: &str) -> Option<&Characteristic> {
        if self.id == id {
            return Some(self);
        }
        self.kind.children().into_iter().find_map(|c| c.find(id))
    }

    /// All descendants, excluding `self`, in declaration order.
    pub fn descendants(&self) -> Vec<&Characteristic> {
        let mut out = Vec::new();
        schema::visit_descendants(self, &mut |node, _| out.push(node));
        out
    }

    /// Map of descendant id to its dotted path relative to `self`.
    pub fn path_index(&self) -> HashMap<String, String> {
        let mut index = HashMap::new();
        schema::visit_descendants(self, &mut |node: &Characteristic, path| {
            index.insert(node.id.clone(), path.to_string());
        });
        index
    }

    /// Resolve a dotted path relative to `self`.
    pub fn descend(&self, path: &str) -> Option<&Characteristic> {
        schema::descend(self, path)
    }

    /// The variable-length node whose element schema has id `element_id`.
    pub fn variable_parent_of(&self, element_id: &str) -> Option<&Characteristic> {
        if let Kind::VariableLength { element, .. } = &self.kind {
            if element.id == element_id {
                return Some(self);
            }
        }
        self.kind
            .children()
            .into_iter()
            .find_map(|c| c.variable_parent_of(element_id))
    }

    /// Primitive type, if this node is a primitive.
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self.kind {
            Kind::Primitive(p) => Some(p),
            _ => None,
        }
    }
}

impl SchemaNode for Characteristic {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &Kind<Self> {
        &self.kind
    }

    fn binding(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn literal(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

/// Registry wire shape of a characteristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCharacteristic {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    type_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    display_unit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub_characteristics: Vec<Characteristic>,
}

impl TryFrom<RawCharacteristic> for Characteristic {
    type Error = MarshallerError;

    fn try_from(raw: RawCharacteristic) -> Result<Self, Self::Error> {
        let kind = Kind::from_parts(
            &raw.type_uri,
            raw.sub_characteristics,
            |c: &Characteristic| c.name.as_str(),
            &raw.id,
        )?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            kind,
            value: raw.value.filter(|v| !v.is_null()),
            display_unit: raw.display_unit,
        })
    }
}

impl From<Characteristic> for RawCharacteristic {
    fn from(c: Characteristic) -> Self {
        Self {
            id: c.id,
            name: c.name,
            type_uri: c.kind.type_uri().to_string(),
            value: c.value,
            display_unit: c.display_unit,
            sub_characteristics: c.kind.into_children(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rgb() -> Characteristic {
        Characteristic::structure(
            "rgb",
            "rgb",
            vec![
                Characteristic::primitive("rgb.r", "r", PrimitiveType::Integer),
                Characteristic::primitive("rgb.g", "g", PrimitiveType::Integer),
                Characteristic::primitive("rgb.b", "b", PrimitiveType::Integer),
            ],
        )
    }

    #[test]
    fn test_deserialize_registry_shape() {
        let c: Characteristic = serde_json::from_value(json!({
            "id": "list",
            "name": "temperatures",
            "type": "https://schema.org/ItemList",
            "sub_characteristics": [
                {"id": "list.item", "name": "*", "type": "https://schema.org/Float"}
            ]
        }))
        .unwrap();
        match &c.kind {
            Kind::VariableLength { container, element } => {
                assert_eq!(*container, Container::List);
                assert_eq!(element.id, "list.item");
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(c.variable_parent_of("list.item").map(|p| p.id.as_str()), Some("list"));
    }

    #[test]
    fn test_serialize_round_trip_keeps_type_uri() {
        let value = serde_json::to_value(rgb()).unwrap();
        assert_eq!(value["type"], json!("https://schema.org/StructuredValue"));
        assert_eq!(value["sub_characteristics"][1]["name"], json!("g"));
        let back: Characteristic = serde_json::from_value(value).unwrap();
        assert_eq!(back, rgb());
    }

    #[test]
    fn test_path_index_and_find() {
        let c = rgb();
        let index = c.path_index();
        assert_eq!(index.get("rgb.g").map(String::as_str), Some("g"));
        assert_eq!(c.find("rgb.b").map(|n| n.name.as_str()), Some("b"));
        assert_eq!(c.descend("r").map(|n| n.id.as_str()), Some("rgb.r"));
        assert_eq!(c.descendants().len(), 3);
    }
}
