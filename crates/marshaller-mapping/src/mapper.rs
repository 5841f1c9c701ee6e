//! Structural mapper: copies values between content-variable trees and
//! characteristic skeletons.
//!
//! * **sensor** (wire → characteristic): walks the content tree over a
//!   decoded wire value and writes every bound primitive leaf into the
//!   characteristic skeleton.
//! * **actuator** (characteristic → wire): walks the characteristic tree over
//!   a characteristic value and writes every leaf into the content slots
//!   bound to it.
//!
//! Structure children match by name, list children by index. A
//! variable-length node iterates the runtime keys or indices and maps each
//! entry through its element schema into a fresh sub-skeleton. When only the
//! `*` element is bound, the first runtime entry stands for it on read and a
//! single entry is written.

use marshaller_core::value::join_path;
use marshaller_core::{
    Characteristic, Container, ContentVariable, Kind, MarshallerError, Result, SchemaNode,
};
use serde_json::{Map, Value};
use tracing::trace;

use crate::skeleton::Skeleton;

/// Fill in the missing half of every variable-length binding.
///
/// A variable-length content node bound to a variable-length characteristic
/// passes that characteristic's element id to its `*` child; a `*` child
/// bound to an element passes the enclosing variable-length characteristic
/// up. A node with neither side bound is an error when anything below it is
/// bound, and is left alone otherwise.
pub fn complete_bindings(
    content: &mut ContentVariable,
    characteristic: &Characteristic,
) -> Result<()> {
    let path = content.name.clone();
    complete_node(content, characteristic, &path)
}

fn complete_node(
    node: &mut ContentVariable,
    characteristic: &Characteristic,
    path: &str,
) -> Result<()> {
    let own = node.characteristic_id.clone();
    let mut completed_own = None;
    if let Kind::VariableLength { element, .. } = &mut node.kind {
        match (own, element.characteristic_id.clone()) {
            (Some(own), None) => {
                if let Some(Kind::VariableLength { element: target, .. }) =
                    characteristic.find(&own).map(|c| &c.kind)
                {
                    trace!(
                        category = "mapping",
                        path = %path,
                        element = %target.id,
                        "Completed element binding"
                    );
                    element.characteristic_id = Some(target.id.clone());
                }
            }
            (None, Some(child)) => {
                if let Some(parent) = characteristic.variable_parent_of(&child) {
                    trace!(
                        category = "mapping",
                        path = %path,
                        parent = %parent.id,
                        "Completed container binding"
                    );
                    completed_own = Some(parent.id.clone());
                }
            }
            (None, None) if element.has_bindings() => {
                return Err(MarshallerError::Validation(format!(
                    "variable-length node '{}' has bound entries but no characteristic \
                     on the node or its '*' child",
                    path
                )));
            }
            _ => {}
        }
    }
    if completed_own.is_some() {
        node.characteristic_id = completed_own;
    }
    for child in node.kind.children_mut() {
        let child_path = join_path(path, &child.name);
        complete_node(child, characteristic, &child_path)?;
    }
    Ok(())
}

/// Reject unbound maps whose `*` element is bound: a single entry has no
/// key to be written under.
pub fn check_writable(content: &ContentVariable) -> Result<()> {
    let mut offending = None;
    content.walk(&mut |node, path| {
        if let Kind::VariableLength {
            container: Container::Map,
            element,
        } = &node.kind
        {
            if node.characteristic_id.is_none() && element.has_bindings() && offending.is_none() {
                offending = Some(path.to_string());
            }
        }
    });
    match offending {
        Some(path) => Err(MarshallerError::Validation(format!(
            "map '{}' has bound entries but no characteristic to take its keys from",
            path
        ))),
        None => Ok(()),
    }
}

/// Whether any strict descendant of `node` is bound.
fn has_bound_descendants<N: SchemaNode>(node: &N) -> bool {
    let mut found = false;
    marshaller_core::model::schema::visit_descendants(node, &mut |n: &N, _| {
        found |= n.binding().is_some()
    });
    found
}

fn check_container(container: Container, value: &Value, path: &str) -> Result<()> {
    let fits = match container {
        Container::Map => value.is_object(),
        Container::List => value.is_array(),
    };
    if fits {
        Ok(())
    } else {
        Err(MarshallerError::type_mismatch(path, container.label(), value))
    }
}

/// Runtime entries of a variable-length value as (key, entry) pairs.
fn runtime_entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Object(fields) => fields.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn collect_entries(container: Container, entries: Vec<(String, Value)>) -> Value {
    match container {
        Container::Map => Value::Object(entries.into_iter().collect::<Map<String, Value>>()),
        Container::List => Value::Array(entries.into_iter().map(|(_, v)| v).collect()),
    }
}

/// Project a decoded wire value onto `characteristic`.
pub fn sensor(
    value: &Value,
    content: &ContentVariable,
    characteristic: &Characteristic,
) -> Result<Value> {
    sensor_filtered(value, content, characteristic, &|_| true)
}

/// [`sensor`] restricted to content paths accepted by `allow`.
pub fn sensor_filtered(
    value: &Value,
    content: &ContentVariable,
    characteristic: &Characteristic,
    allow: &dyn Fn(&str) -> bool,
) -> Result<Value> {
    let mut content = content.clone();
    complete_bindings(&mut content, characteristic)?;
    let mut skeleton = Skeleton::build(characteristic);
    let walker = SensorWalk { characteristic, allow };
    walker.walk(value, &content, &content.name, &mut skeleton)?;
    Ok(skeleton.into_value())
}

struct SensorWalk<'a> {
    characteristic: &'a Characteristic,
    allow: &'a dyn Fn(&str) -> bool,
}

impl SensorWalk<'_> {
    fn write(
        &self,
        binding: Option<&str>,
        value: &Value,
        skeleton: &mut Skeleton<'_, Characteristic>,
    ) -> Result<()> {
        if let Some(id) = binding {
            for slot in skeleton.slots(id).to_vec() {
                skeleton.set(slot, value)?;
            }
        }
        Ok(())
    }

    fn walk(
        &self,
        value: &Value,
        node: &ContentVariable,
        path: &str,
        skeleton: &mut Skeleton<'_, Characteristic>,
    ) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        match &node.kind {
            Kind::Primitive(p) => {
                if !p.accepts(value) {
                    return Err(MarshallerError::type_mismatch(path, p.label(), value));
                }
                if (self.allow)(path) {
                    self.write(node.binding(), value, skeleton)?;
                }
            }
            Kind::Structure(children) => {
                let fields = value
                    .as_object()
                    .ok_or_else(|| MarshallerError::type_mismatch(path, "structure", value))?;
                if node.binding().is_some() && !has_bound_descendants(node) && (self.allow)(path) {
                    return self.write(node.binding(), value, skeleton);
                }
                for child in children {
                    if let Some(v) = fields.get(&child.name) {
                        self.walk(v, child, &join_path(path, &child.name), skeleton)?;
                    }
                }
            }
            Kind::List(children) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| MarshallerError::type_mismatch(path, "list", value))?;
                if node.binding().is_some() && !has_bound_descendants(node) && (self.allow)(path) {
                    return self.write(node.binding(), value, skeleton);
                }
                for (i, (child, v)) in children.iter().zip(items).enumerate() {
                    self.walk(v, child, &join_path(path, &i.to_string()), skeleton)?;
                }
            }
            Kind::VariableLength { container, element } => {
                check_container(*container, value, path)?;
                let Some(id) = node.binding() else {
                    return self.walk_first_entry(value, element, path, skeleton);
                };
                if !(self.allow)(path) {
                    return Ok(());
                }
                let target = match self.characteristic.find(id).map(|c| &c.kind) {
                    Some(Kind::VariableLength { element: target, .. }) => target.as_ref(),
                    Some(_) => return self.write(Some(id), value, skeleton),
                    None => return Ok(()),
                };
                let mut entries = Vec::new();
                for (key, entry) in runtime_entries(value) {
                    let mut sub = Skeleton::build(target);
                    self.walk(entry, element, &join_path(path, &key), &mut sub)?;
                    entries.push((key, sub.into_value()));
                }
                trace!(
                    category = "mapping",
                    path = %path,
                    entries = entries.len(),
                    "Expanded variable-length output"
                );
                self.write(Some(id), &collect_entries(*container, entries), skeleton)?;
            }
        }
        Ok(())
    }

    /// Read an unbound variable-length node through its bound `*` element,
    /// taking the first runtime entry. Paths below keep the `*` segment.
    fn walk_first_entry(
        &self,
        value: &Value,
        element: &ContentVariable,
        path: &str,
        skeleton: &mut Skeleton<'_, Characteristic>,
    ) -> Result<()> {
        let mut relevant = false;
        element.walk(&mut |node, _| {
            if let Some(id) = &node.characteristic_id {
                relevant |= !skeleton.slots(id).is_empty();
            }
        });
        if !relevant {
            return Ok(());
        }
        let element_path = join_path(path, &element.name);
        match runtime_entries(value).into_iter().next() {
            Some((_, entry)) => self.walk(entry, element, &element_path, skeleton),
            None if (self.allow)(&element_path) => {
                Err(MarshallerError::path_not_found(join_path(path, "0")))
            }
            None => Ok(()),
        }
    }
}

/// Lay out a characteristic value in the shape of `content`.
pub fn actuator(
    value: &Value,
    characteristic: &Characteristic,
    content: &ContentVariable,
) -> Result<Value> {
    let mut content = content.clone();
    complete_bindings(&mut content, characteristic)?;
    check_writable(&content)?;
    let mut skeleton = Skeleton::build(&content);
    actuate_into(value, characteristic, &mut skeleton)?;
    Ok(skeleton.into_value())
}

/// Write a characteristic value into an existing content skeleton. The
/// skeleton's schema must already have completed bindings.
pub fn actuate_into(
    value: &Value,
    characteristic: &Characteristic,
    skeleton: &mut Skeleton<'_, ContentVariable>,
) -> Result<()> {
    actuate(value, characteristic, &characteristic.name, skeleton)
}

fn actuate(
    value: &Value,
    node: &Characteristic,
    path: &str,
    skeleton: &mut Skeleton<'_, ContentVariable>,
) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    match &node.kind {
        Kind::Primitive(p) => {
            if !p.accepts(value) {
                return Err(MarshallerError::type_mismatch(path, p.label(), value));
            }
            for slot in skeleton.slots(&node.id).to_vec() {
                skeleton.set(slot, value)?;
            }
        }
        Kind::Structure(children) => {
            let fields = value
                .as_object()
                .ok_or_else(|| MarshallerError::type_mismatch(path, "structure", value))?;
            write_whole(value, &node.id, skeleton)?;
            for child in children {
                if let Some(v) = fields.get(&child.name) {
                    actuate(v, child, &join_path(path, &child.name), skeleton)?;
                }
            }
        }
        Kind::List(children) => {
            let items = value
                .as_array()
                .ok_or_else(|| MarshallerError::type_mismatch(path, "list", value))?;
            write_whole(value, &node.id, skeleton)?;
            for (i, (child, v)) in children.iter().zip(items).enumerate() {
                actuate(v, child, &join_path(path, &i.to_string()), skeleton)?;
            }
        }
        Kind::VariableLength { container, element } => {
            check_container(*container, value, path)?;
            for slot in skeleton.slots(&node.id).to_vec() {
                let content = skeleton.schema(slot);
                let Kind::VariableLength {
                    container: target_container,
                    element: content_element,
                } = &content.kind
                else {
                    skeleton.set(slot, value)?;
                    continue;
                };
                let mut entries = Vec::new();
                for (key, entry) in runtime_entries(value) {
                    let mut sub = Skeleton::build(content_element.as_ref());
                    actuate(entry, element, &join_path(path, &key), &mut sub)?;
                    entries.push((key, sub.into_value()));
                }
                skeleton.set(slot, &collect_entries(*target_container, entries))?;
            }
        }
    }
    Ok(())
}

/// Write a container value into content slots bound to the container as a
/// whole (those without bound descendants of their own).
fn write_whole(
    value: &Value,
    id: &str,
    skeleton: &mut Skeleton<'_, ContentVariable>,
) -> Result<()> {
    for slot in skeleton.slots(id).to_vec() {
        if !has_bound_descendants(skeleton.schema(slot)) {
            skeleton.set(slot, value)?;
        }
    }
    Ok(())
}
