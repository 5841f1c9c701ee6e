//! Tagged-tree representation shared by Characteristic and ContentVariable.
//!
//! The registry describes both schema kinds with a schema.org type URI and an
//! ordered list of named children. A Structure or List node whose only child
//! is named [`PLACEHOLDER`] is variable-length: the child's subtree is the
//! schema of every runtime entry. [`Kind`] makes that case a variant of its
//! own so callers match on it instead of inspecting child names.

use serde_json::Value;

use crate::error::{MarshallerError, Result};
use crate::value::join_path;

/// Name of the single child of a variable-length node.
pub const PLACEHOLDER: &str = "*";

/// schema.org type URIs used by the registry.
pub mod type_uri {
    pub const STRING: &str = "https://schema.org/Text";
    pub const INTEGER: &str = "https://schema.org/Integer";
    pub const FLOAT: &str = "https://schema.org/Float";
    pub const BOOLEAN: &str = "https://schema.org/Boolean";
    pub const STRUCTURE: &str = "https://schema.org/StructuredValue";
    pub const LIST: &str = "https://schema.org/ItemList";
}

/// Scalar type of a primitive schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    Boolean,
}

impl PrimitiveType {
    /// Zero value seeded into skeletons when no literal default exists.
    ///
    /// Integer and Float share the numeric slot type.
    pub fn zero(self) -> Value {
        match self {
            PrimitiveType::String => Value::String(String::new()),
            PrimitiveType::Integer | PrimitiveType::Float => crate::value::number(0.0),
            PrimitiveType::Boolean => Value::Bool(false),
        }
    }

    /// Whether `value` has the runtime shape of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            PrimitiveType::String => value.is_string(),
            PrimitiveType::Integer | PrimitiveType::Float => value.is_number(),
            PrimitiveType::Boolean => value.is_boolean(),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, PrimitiveType::Integer | PrimitiveType::Float)
    }

    pub fn type_uri(self) -> &'static str {
        match self {
            PrimitiveType::String => type_uri::STRING,
            PrimitiveType::Integer => type_uri::INTEGER,
            PrimitiveType::Float => type_uri::FLOAT,
            PrimitiveType::Boolean => type_uri::BOOLEAN,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
        }
    }
}

/// Runtime container of a variable-length node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Structure keyed by runtime names.
    Map,
    /// List indexed by position.
    List,
}

impl Container {
    pub fn empty(self) -> Value {
        match self {
            Container::Map => Value::Object(serde_json::Map::new()),
            Container::List => Value::Array(Vec::new()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Container::Map => "structure",
            Container::List => "list",
        }
    }

    fn type_uri(self) -> &'static str {
        match self {
            Container::Map => type_uri::STRUCTURE,
            Container::List => type_uri::LIST,
        }
    }
}

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Kind<T> {
    Primitive(PrimitiveType),
    /// Named children, matched against runtime values by name.
    Structure(Vec<T>),
    /// Positional children, matched against runtime values by index.
    List(Vec<T>),
    /// One element schema cloned per runtime key or index.
    VariableLength { container: Container, element: Box<T> },
}

impl<T> Kind<T> {
    /// Zero value for this shape. Variable-length nodes start empty.
    pub fn zero(&self) -> Value {
        match self {
            Kind::Primitive(p) => p.zero(),
            Kind::Structure(_) => Container::Map.empty(),
            Kind::List(_) => Container::List.empty(),
            Kind::VariableLength { container, .. } => container.empty(),
        }
    }

    /// Short label used in type mismatch messages.
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Primitive(p) => p.label(),
            Kind::Structure(_) => "structure",
            Kind::List(_) => "list",
            Kind::VariableLength { container, .. } => container.label(),
        }
    }

    pub fn type_uri(&self) -> &'static str {
        match self {
            Kind::Primitive(p) => p.type_uri(),
            Kind::Structure(_) => type_uri::STRUCTURE,
            Kind::List(_) => type_uri::LIST,
            Kind::VariableLength { container, .. } => container.type_uri(),
        }
    }

    /// Declared children in order. A variable-length node yields its element.
    pub fn children(&self) -> Vec<&T> {
        match self {
            Kind::Primitive(_) => Vec::new(),
            Kind::Structure(children) | Kind::List(children) => children.iter().collect(),
            Kind::VariableLength { element, .. } => vec![element.as_ref()],
        }
    }

    pub fn children_mut(&mut self) -> Vec<&mut T> {
        match self {
            Kind::Primitive(_) => Vec::new(),
            Kind::Structure(children) | Kind::List(children) => children.iter_mut().collect(),
            Kind::VariableLength { element, .. } => vec![element.as_mut()],
        }
    }

    /// Build a kind from a registry type URI and its ordered children.
    ///
    /// `name_of` extracts a child's name to detect the placeholder.
    pub fn from_parts(
        type_uri_value: &str,
        mut children: Vec<T>,
        name_of: impl Fn(&T) -> &str,
        node: &str,
    ) -> Result<Self> {
        let placeholder = children.len() == 1 && name_of(&children[0]) == PLACEHOLDER;
        let container = match type_uri_value {
            type_uri::STRING => return Ok(Kind::Primitive(PrimitiveType::String)),
            type_uri::INTEGER => return Ok(Kind::Primitive(PrimitiveType::Integer)),
            type_uri::FLOAT => return Ok(Kind::Primitive(PrimitiveType::Float)),
            type_uri::BOOLEAN => return Ok(Kind::Primitive(PrimitiveType::Boolean)),
            type_uri::STRUCTURE => Container::Map,
            type_uri::LIST => Container::List,
            other => {
                return Err(MarshallerError::Validation(format!(
                    "unknown type '{}' on schema node '{}'",
                    other, node
                )))
            }
        };
        if placeholder {
            if let Some(element) = children.pop() {
                return Ok(Kind::VariableLength {
                    container,
                    element: Box::new(element),
                });
            }
        }
        if children.iter().any(|c| name_of(c) == PLACEHOLDER) {
            return Err(MarshallerError::Validation(format!(
                "placeholder '{}' must be the only child of '{}'",
                PLACEHOLDER, node
            )));
        }
        Ok(match container {
            Container::Map => Kind::Structure(children),
            Container::List => Kind::List(children),
        })
    }

    /// Split back into ordered children, the inverse of [`Kind::from_parts`].
    pub fn into_children(self) -> Vec<T> {
        match self {
            Kind::Primitive(_) => Vec::new(),
            Kind::Structure(children) | Kind::List(children) => children,
            Kind::VariableLength { element, .. } => vec![*element],
        }
    }
}

/// Common view over Characteristic and ContentVariable trees.
///
/// `binding` is the characteristic id a node is addressed by: a
/// Characteristic's own id, or the characteristic a ContentVariable
/// references.
pub trait SchemaNode: Sized {
    fn name(&self) -> &str;
    fn kind(&self) -> &Kind<Self>;
    fn binding(&self) -> Option<&str>;
    fn literal(&self) -> Option<&Value>;

    /// Void nodes are left out of generated values.
    fn is_void(&self) -> bool {
        false
    }
}

/// Visit `node` and all descendants in declaration order with their dotted
/// paths. The root's path is its own name prefixed by `base`.
pub fn visit<'a, N: SchemaNode>(node: &'a N, base: &str, f: &mut impl FnMut(&'a N, &str)) {
    let here = join_path(base, node.name());
    f(node, &here);
    for child in node.kind().children() {
        visit(child, &here, f);
    }
}

/// Like [`visit`] but paths are relative to `node`, which is not visited.
pub fn visit_descendants<'a, N: SchemaNode>(node: &'a N, f: &mut impl FnMut(&'a N, &str)) {
    for child in node.kind().children() {
        visit(child, "", f);
    }
}

/// Resolve a child of `node` by one path segment.
///
/// Structures match by name, lists by name or position, and a
/// variable-length node resolves the placeholder and every concrete key to
/// its element schema.
pub fn child_by_segment<'a, N: SchemaNode>(node: &'a N, segment: &str) -> Option<&'a N> {
    match node.kind() {
        Kind::Primitive(_) => None,
        Kind::Structure(children) => children.iter().find(|c| c.name() == segment),
        Kind::List(children) => children
            .iter()
            .find(|c| c.name() == segment)
            .or_else(|| segment.parse::<usize>().ok().and_then(|i| children.get(i))),
        Kind::VariableLength { element, .. } => Some(element.as_ref()),
    }
}

/// Resolve a path relative to `node` (empty path is `node` itself).
pub fn descend<'a, N: SchemaNode>(node: &'a N, path: &str) -> Option<&'a N> {
    if path.is_empty() {
        return Some(node);
    }
    path.split('.')
        .try_fold(node, |current, segment| child_by_segment(current, segment))
}

/// Resolve a path whose first segment is the root's own name.
pub fn find_by_path<'a, N: SchemaNode>(root: &'a N, path: &str) -> Option<&'a N> {
    match path.split_once('.') {
        None if path == root.name() => Some(root),
        Some((head, rest)) if head == root.name() => descend(root, rest),
        _ => None,
    }
}
