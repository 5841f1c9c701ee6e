//! Skeleton builder and binder.
//!
//! A [`Skeleton`] is built once from a schema tree: an arena of slots that
//! mirrors the tree's shape plus an index from binding id to slot ids.
//! Values are bound later through [`Skeleton::set`] without walking the tree
//! again, and [`Skeleton::into_value`] materialises the generic value.
//!
//! Primitives start at their literal default or the type's zero value.
//! Variable-length nodes start empty and are filled as one unit by the
//! structural mapper. An unbound list whose `*` element carries bindings
//! holds that element as its single entry instead, so the bindings below it
//! get slots of their own. Numbers are normalised on every write, so integer and
//! float slots are indistinguishable in the result.

use marshaller_core::model::schema;
use marshaller_core::value::{join_path, normalize_deep, normalize_number};
use marshaller_core::{Container, Kind, MarshallerError, Result, SchemaNode};
use serde_json::Value;
use std::collections::HashMap;

/// Index of a slot in a skeleton arena.
pub type SlotId = usize;

#[derive(Debug, Clone)]
enum Slot {
    Scalar(Value),
    Object(Vec<(String, SlotId)>),
    Array(Vec<SlotId>),
    /// Variable-length container, kept as a whole value.
    Expandable(Value),
}

struct Entry<'s, S> {
    schema: &'s S,
    path: String,
    slot: Slot,
}

pub struct Skeleton<'s, S> {
    entries: Vec<Entry<'s, S>>,
    index: HashMap<String, Vec<SlotId>>,
}

impl<'s, S: SchemaNode> Skeleton<'s, S> {
    /// Build the skeleton of `schema`. Slot paths start with the root's name.
    pub fn build(schema: &'s S) -> Self {
        let mut skeleton = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };
        skeleton.alloc(schema, schema.name().to_string());
        skeleton
    }

    fn alloc(&mut self, node: &'s S, path: String) -> SlotId {
        let id = self.entries.len();
        self.entries.push(Entry {
            schema: node,
            path: path.clone(),
            slot: Slot::Scalar(Value::Null),
        });
        if let Some(binding) = node.binding() {
            self.index.entry(binding.to_string()).or_default().push(id);
        }

        let slot = match node.kind() {
            Kind::Primitive(p) => Slot::Scalar(
                node.literal()
                    .filter(|v| p.accepts(v))
                    .map(normalize_number)
                    .unwrap_or_else(|| p.zero()),
            ),
            Kind::Structure(children) => Slot::Object(
                children
                    .iter()
                    .filter(|c| !c.is_void())
                    .map(|c| (c.name().to_string(), self.alloc(c, join_path(&path, c.name()))))
                    .collect(),
            ),
            Kind::List(children) => Slot::Array(
                children
                    .iter()
                    .filter(|c| !c.is_void())
                    .map(|c| self.alloc(c, join_path(&path, c.name())))
                    .collect(),
            ),
            Kind::VariableLength {
                container: Container::List,
                element,
            } if node.binding().is_none()
                && node.literal().is_none()
                && has_binding(element.as_ref()) =>
            {
                let element = element.as_ref();
                Slot::Array(vec![self.alloc(element, join_path(&path, element.name()))])
            }
            Kind::VariableLength { container, .. } => Slot::Expandable(
                node.literal()
                    .filter(|v| fits(*container, v))
                    .map(normalize_deep)
                    .unwrap_or_else(|| container.empty()),
            ),
        };
        self.entries[id].slot = slot;
        id
    }

    pub fn root(&self) -> SlotId {
        0
    }

    /// Slots bound to `binding`, in declaration order.
    pub fn slots(&self, binding: &str) -> &[SlotId] {
        self.index.get(binding).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First slot bound to `binding`.
    pub fn slot(&self, binding: &str) -> Option<SlotId> {
        self.slots(binding).first().copied()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn schema(&self, slot: SlotId) -> &'s S {
        self.entries[slot].schema
    }

    pub fn path(&self, slot: SlotId) -> &str {
        &self.entries[slot].path
    }

    /// Drop index entries whose slot path is not accepted by `keep`. The
    /// slots stay in the value with their defaults.
    pub fn retain_paths(&mut self, keep: impl Fn(&str) -> bool) {
        let entries = &self.entries;
        for slots in self.index.values_mut() {
            slots.retain(|&slot| keep(&entries[slot].path));
        }
        self.index.retain(|_, slots| !slots.is_empty());
    }

    fn mismatch(&self, slot: SlotId, expected: &str, value: &Value) -> MarshallerError {
        MarshallerError::type_mismatch(self.path(slot), expected, value)
    }

    /// Write `value` into `slot`. Containers are matched by child name or
    /// position; absent keys and surplus entries are skipped, null is a no-op.
    pub fn set(&mut self, slot: SlotId, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let schema = self.entries[slot].schema;
        match schema.kind() {
            Kind::Primitive(p) => {
                if !p.accepts(value) {
                    return Err(self.mismatch(slot, p.label(), value));
                }
                self.entries[slot].slot = Slot::Scalar(normalize_number(value));
            }
            Kind::Structure(_) => {
                let fields = value
                    .as_object()
                    .ok_or_else(|| self.mismatch(slot, "structure", value))?;
                let children = match &self.entries[slot].slot {
                    Slot::Object(children) => children.clone(),
                    _ => Vec::new(),
                };
                for (name, child) in children {
                    if let Some(v) = fields.get(&name) {
                        self.set(child, v)?;
                    }
                }
            }
            Kind::List(_) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| self.mismatch(slot, "list", value))?;
                let children = match &self.entries[slot].slot {
                    Slot::Array(children) => children.clone(),
                    _ => Vec::new(),
                };
                for (child, v) in children.into_iter().zip(items) {
                    self.set(child, v)?;
                }
            }
            Kind::VariableLength { container, .. } => {
                if !fits(*container, value) {
                    return Err(self.mismatch(slot, container.label(), value));
                }
                self.entries[slot].slot = Slot::Expandable(normalize_deep(value));
            }
        }
        Ok(())
    }

    /// Materialise the value below `slot`.
    pub fn get(&self, slot: SlotId) -> Value {
        match &self.entries[slot].slot {
            Slot::Scalar(v) | Slot::Expandable(v) => v.clone(),
            Slot::Object(children) => Value::Object(
                children
                    .iter()
                    .map(|(name, child)| (name.clone(), self.get(*child)))
                    .collect(),
            ),
            Slot::Array(children) => Value::Array(children.iter().map(|c| self.get(*c)).collect()),
        }
    }

    pub fn into_value(self) -> Value {
        if self.entries.is_empty() {
            return Value::Null;
        }
        self.get(self.root())
    }
}

fn has_binding<S: SchemaNode>(node: &S) -> bool {
    let mut found = false;
    schema::visit(node, "", &mut |n: &S, _| found |= n.binding().is_some());
    found
}

fn fits(container: Container, value: &Value) -> bool {
    match container {
        Container::Map => value.is_object(),
        Container::List => value.is_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshaller_core::{Characteristic, ContentVariable, PrimitiveType};
    use serde_json::json;

    fn rgb(reversed: bool) -> Characteristic {
        let mut children = vec![
            Characteristic::primitive("rgb.r", "r", PrimitiveType::Integer),
            Characteristic::primitive("rgb.g", "g", PrimitiveType::Integer),
            Characteristic::primitive("rgb.b", "b", PrimitiveType::Integer),
        ];
        if reversed {
            children.reverse();
        }
        Characteristic::structure("rgb", "rgb", children)
    }

    #[test]
    fn test_bound_slots_produce_map_keyed_by_name() {
        let mut results = Vec::new();
        for reversed in [false, true] {
            let schema = rgb(reversed);
            let mut skeleton = Skeleton::build(&schema);
            for (id, v) in [("rgb.r", 255.0), ("rgb.g", 0.0), ("rgb.b", 100.0)] {
                let slot = skeleton.slot(id).unwrap();
                skeleton.set(slot, &json!(v)).unwrap();
            }
            results.push(skeleton.into_value());
        }
        assert_eq!(results[0], json!({"r": 255, "g": 0, "b": 100}));
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn test_defaults_and_zero_values() {
        let schema = Characteristic::structure(
            "s",
            "s",
            vec![
                Characteristic::primitive("s.unit", "unit", PrimitiveType::String)
                    .with_value(json!("C")),
                Characteristic::primitive("s.on", "on", PrimitiveType::Boolean),
                Characteristic::variable_length(
                    "s.history",
                    "history",
                    Container::List,
                    Characteristic::primitive("s.history.item", "*", PrimitiveType::Float),
                ),
            ],
        );
        let skeleton = Skeleton::build(&schema);
        assert_eq!(
            skeleton.into_value(),
            json!({"unit": "C", "on": false, "history": []})
        );
    }

    #[test]
    fn test_content_index_keeps_every_position() {
        let schema = ContentVariable::structure(
            "root",
            "value",
            vec![
                ContentVariable::primitive("a", "a", PrimitiveType::Float)
                    .with_characteristic("celsius"),
                ContentVariable::primitive("b", "b", PrimitiveType::Float)
                    .with_characteristic("celsius"),
                ContentVariable::primitive("c", "c", PrimitiveType::Float).void(),
            ],
        );
        let mut skeleton = Skeleton::build(&schema);
        assert_eq!(skeleton.slots("celsius").len(), 2);
        for slot in skeleton.slots("celsius").to_vec() {
            skeleton.set(slot, &json!(21.0)).unwrap();
        }
        assert_eq!(skeleton.into_value(), json!({"a": 21, "b": 21}));
    }

    #[test]
    fn test_retain_paths() {
        let schema = ContentVariable::structure(
            "root",
            "value",
            vec![
                ContentVariable::primitive("a", "a", PrimitiveType::Float)
                    .with_characteristic("celsius"),
                ContentVariable::primitive("b", "b", PrimitiveType::Float)
                    .with_characteristic("celsius"),
            ],
        );
        let mut skeleton = Skeleton::build(&schema);
        skeleton.retain_paths(|path| path == "value.b");
        let slots = skeleton.slots("celsius").to_vec();
        assert_eq!(slots.len(), 1);
        assert_eq!(skeleton.path(slots[0]), "value.b");
    }

    #[test]
    fn test_unbound_list_holds_bound_element_once() {
        let schema = ContentVariable::structure(
            "root",
            "value",
            vec![
                ContentVariable::variable_length(
                    "list",
                    "history",
                    Container::List,
                    ContentVariable::primitive("entry", "*", PrimitiveType::Float)
                        .with_characteristic("celsius"),
                ),
                ContentVariable::variable_length(
                    "free",
                    "free",
                    Container::List,
                    ContentVariable::primitive("item", "*", PrimitiveType::Float),
                ),
            ],
        );
        let mut skeleton = Skeleton::build(&schema);
        let slot = skeleton.slot("celsius").unwrap();
        assert_eq!(skeleton.path(slot), "value.history.*");
        skeleton.set(slot, &json!(21.0)).unwrap();
        assert_eq!(skeleton.into_value(), json!({"history": [21], "free": []}));
    }

    #[test]
    fn test_shape_mismatch() {
        let schema = rgb(false);
        let mut skeleton = Skeleton::build(&schema);
        let root = skeleton.root();
        let err = skeleton.set(root, &json!(42)).unwrap_err();
        assert!(matches!(err, MarshallerError::TypeMismatch { path, .. } if path == "rgb"));
        let r = skeleton.slot("rgb.r").unwrap();
        assert!(skeleton.set(r, &json!("ff")).is_err());
    }

    #[test]
    fn test_partial_structure_keeps_defaults() {
        let schema = rgb(false);
        let mut skeleton = Skeleton::build(&schema);
        let root = skeleton.root();
        skeleton.set(root, &json!({"r": 1, "extra": true})).unwrap();
        assert_eq!(skeleton.into_value(), json!({"r": 1, "g": 0, "b": 0}));
    }
}
