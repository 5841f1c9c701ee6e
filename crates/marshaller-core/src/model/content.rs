//! ContentVariable schema trees describing wire message structure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{self, Container, Kind, PrimitiveType, SchemaNode};
use crate::error::MarshallerError;

/// Serialization option marking a field as an XML attribute.
pub const XML_ATTRIBUTE: &str = "xml_attribute";

/// Typed schema node describing a wire field, optionally tagged with a
/// characteristic, function and aspect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContentVariable", into = "RawContentVariable")]
pub struct ContentVariable {
    pub id: String,
    pub name: String,
    pub kind: Kind<ContentVariable>,
    pub characteristic_id: Option<String>,
    pub function_id: Option<String>,
    pub aspect_id: Option<String>,
    pub is_void: bool,
    /// Literal value written to the wire when nothing else is bound.
    pub value: Option<Value>,
    pub serialization_options: Vec<String>,
}

impl ContentVariable {
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
        children: Vec<ContentVariable>,
    ) -> Self {
        Self::with_kind(id, name, Kind::Structure(children))
    }

    pub fn list(
        id: impl Into<String>,
        name: impl Into<String>,
        children: Vec<ContentVariable>,
    ) -> Self {
        Self::with_kind(id, name, Kind::List(children))
    }

    pub fn variable_length(
        id: impl Into<String>,
        name: impl Into<String>,
        container: Container,
        element: ContentVariable,
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
        kind: Kind<ContentVariable>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            characteristic_id: None,
            function_id: None,
            aspect_id: None,
            is_void: false,
            value: None,
            serialization_options: Vec::new(),
        }
    }

    pub fn with_characteristic(mut self, characteristic_id: impl Into<String>) -> Self {
        self.characteristic_id = Some(characteristic_id.into());
        self
    }

    pub fn with_function(mut self, function_id: impl Into<String>) -> Self {
        self.function_id = Some(function_id.into());
        self
    }

    pub fn with_aspect(mut self, aspect_id: impl Into<String>) -> Self {
        self.aspect_id = Some(aspect_id.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_serialization_option(mut self, option: impl Into<String>) -> Self {
        self.serialization_options.push(option.into());
        self
    }

    pub fn void(mut self) -> Self {
        self.is_void = true;
        self
    }

    pub fn serialize_as_attribute(&self) -> bool {
        self.serialization_options.iter().any(|o| o == XML_ATTRIBUTE)
    }

    /// Visit this node and all descendants with their dotted paths, rooted at
    /// this node's name.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ContentVariable, &str)) {
        schema::visit(self, "", f);
    }

    /// Resolve a dotted path whose first segment is this node's name.
    pub fn find_by_path(&self, path: &str) -> Option<&ContentVariable> {
        schema::find_by_path(self, path)
    }

    /// Mutable variant of [`ContentVariable::find_by_path`].
    ///
    /// Only declared names match here, so the placeholder segment is needed
    /// to address a variable-length element.
    pub fn find_by_path_mut(&mut self, path: &str) -> Option<&mut ContentVariable> {
        let mut segments = path.split('.');
        if segments.next() != Some(self.name.as_str()) {
            return None;
        }
        segments.try_fold(self, |current, segment| {
            current
                .kind
                .children_mut()
                .into_iter()
                .find(|c| c.name == segment)
        })
    }

    /// Every characteristic id referenced anywhere in this tree.
    pub fn characteristic_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.walk(&mut |node, _| {
            if let Some(id) = &node.characteristic_id {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        });
        ids
    }

    /// Whether this node or any descendant references a characteristic.
    pub fn has_bindings(&self) -> bool {
        let mut found = false;
        self.walk(&mut |node, _| found |= node.characteristic_id.is_some());
        found
    }
}

impl SchemaNode for ContentVariable {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &Kind<Self> {
        &self.kind
    }

    fn binding(&self) -> Option<&str> {
        self.characteristic_id.as_deref()
    }

    fn literal(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    fn is_void(&self) -> bool {
        self.is_void
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

/// Registry wire shape of a content variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawContentVariable {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(rename = "type")]
    type_uri: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub_content_variables: Vec<ContentVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    characteristic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aspect_id: Option<String>,
    #[serde(default)]
    is_void: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    serialization_options: Vec<String>,
}

impl TryFrom<RawContentVariable> for ContentVariable {
    type Error = MarshallerError;

    fn try_from(raw: RawContentVariable) -> Result<Self, Self::Error> {
        let kind = Kind::from_parts(
            &raw.type_uri,
            raw.sub_content_variables,
            |c: &ContentVariable| c.name.as_str(),
            &raw.name,
        )?;
        Ok(Self {
            id: raw.id,
            name: raw.name,
            kind,
            characteristic_id: non_empty(raw.characteristic_id),
            function_id: non_empty(raw.function_id),
            aspect_id: non_empty(raw.aspect_id),
            is_void: raw.is_void,
            value: raw.value.filter(|v| !v.is_null()),
            serialization_options: raw.serialization_options,
        })
    }
}

impl From<ContentVariable> for RawContentVariable {
    fn from(c: ContentVariable) -> Self {
        Self {
            id: c.id,
            name: c.name,
            type_uri: c.kind.type_uri().to_string(),
            sub_content_variables: c.kind.into_children(),
            characteristic_id: c.characteristic_id,
            function_id: c.function_id,
            aspect_id: c.aspect_id,
            is_void: c.is_void,
            value: c.value,
            serialization_options: c.serialization_options,
        }
    }
}
