//! Marshal / unmarshal orchestration.
//!
//! Composes the concept repository, caster, structural mapper, path resolver
//! and codecs into the operations exposed to callers:
//!
//! | Operation | Direction | Addressing |
//! |-----------|-----------|------------|
//! | [`Marshaller::marshal_inputs`] | value → wire | every input bound to the value's concept |
//! | [`Marshaller::unmarshal_outputs`] | wire → value | best output for the concept |
//! | [`Marshaller::marshal_v2`] | values → wire | explicit paths or function/aspect lookup |
//! | [`Marshaller::unmarshal_v2`] | wire → value | one explicit path |
//!
//! Wire maps are keyed by protocol segment name.

use marshaller_codecs::CodecRegistry;
use marshaller_concepts::ConceptRepository;
use marshaller_core::value::{join_path, normalize_deep, normalize_number, parse_scalar};
use marshaller_core::{
    Configurable, Container, Content, ContentVariable, ConverterExtension, Kind, MarshallerError,
    MissingPathPolicy, Protocol, Result, Service,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::casting::{CastRegistry, Caster};
use crate::mapper::{
    actuate_into, actuator, check_writable, complete_bindings, sensor, sensor_filtered,
};
use crate::paths::{allowed, is_within, paths_for};
use crate::skeleton::Skeleton;

/// Wire messages keyed by protocol segment name.
pub type WireMap = BTreeMap<String, String>;

/// One value to place into a service's inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarshallingInput {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characteristic_id: Option<String>,
    /// Explicit target paths. When empty, paths are resolved by function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_node_id: Option<String>,
}

impl MarshallingInput {
    pub fn at_paths(
        value: Value,
        characteristic_id: impl Into<String>,
        paths: Vec<String>,
    ) -> Self {
        Self {
            value,
            characteristic_id: Some(characteristic_id.into()),
            paths,
            function_id: None,
            aspect_node_id: None,
        }
    }

    pub fn for_function(
        value: Value,
        characteristic_id: impl Into<String>,
        function_id: impl Into<String>,
    ) -> Self {
        Self {
            value,
            characteristic_id: Some(characteristic_id.into()),
            paths: Vec::new(),
            function_id: Some(function_id.into()),
            aspect_node_id: None,
        }
    }

    pub fn with_aspect(mut self, aspect_node_id: impl Into<String>) -> Self {
        self.aspect_node_id = Some(aspect_node_id.into());
        self
    }
}

pub struct Marshaller {
    repository: Arc<ConceptRepository>,
    caster: Caster,
    codecs: Arc<CodecRegistry>,
    missing_path: MissingPathPolicy,
}

/// A bound output chosen by [`Marshaller::unmarshal_outputs`].
struct Candidate {
    content_index: usize,
    path: String,
    characteristic_id: String,
    root_id: String,
    hint_rank: usize,
}

impl Marshaller {
    pub fn new(
        repository: Arc<ConceptRepository>,
        casts: Arc<CastRegistry>,
        codecs: Arc<CodecRegistry>,
    ) -> Self {
        Self {
            caster: Caster::new(Arc::clone(&repository), casts),
            repository,
            codecs,
            missing_path: MissingPathPolicy::default(),
        }
    }

    /// What [`Marshaller::unmarshal_v2`] returns for a path absent from the wire.
    pub fn with_missing_path(mut self, policy: MissingPathPolicy) -> Self {
        self.missing_path = policy;
        self
    }

    pub fn repository(&self) -> &Arc<ConceptRepository> {
        &self.repository
    }

    pub fn caster(&self) -> &Caster {
        &self.caster
    }

    /// Marshal one value plus configurables into every input of `service`.
    ///
    /// Each input content receives the value cast into every root
    /// characteristic it references from the value's concept. Configurables
    /// are applied first, so the main value wins where both land. A non-empty
    /// `path_allow_list` limits which content paths are written.
    pub fn marshal_inputs(
        &self,
        protocol: &Protocol,
        service: &Service,
        value: &Value,
        characteristic_id: &str,
        path_allow_list: &[String],
        configurables: &[Configurable],
    ) -> Result<WireMap> {
        protocol.check_service(service)?;

        let mut assignments: Vec<(String, Value, String)> = Vec::new();
        for configurable in configurables {
            let concept = self
                .repository
                .get_concept_of_characteristic(&configurable.characteristic_id)?;
            assignments.push((
                concept.id.clone(),
                self.configurable_value(configurable)?,
                configurable.characteristic_id.clone(),
            ));
        }
        let concept = self.repository.get_concept_of_characteristic(characteristic_id)?;
        assignments.push((concept.id.clone(), value.clone(), characteristic_id.to_string()));

        let mut wire = WireMap::new();
        for content in &service.inputs {
            let roots = self
                .repository
                .get_root_characteristics(&content.root.characteristic_ids())?;
            let mut schema = content.root.clone();
            for root in &roots {
                complete_bindings(&mut schema, root)?;
            }
            check_writable(&schema)?;

            let mut skeleton = Skeleton::build(&schema);
            skeleton.retain_paths(|path| allowed(path_allow_list, path));
            for root in &roots {
                let root_concept = self.repository.get_concept_of_characteristic(&root.id)?;
                for (concept_id, v, from) in &assignments {
                    if *concept_id != root_concept.id {
                        continue;
                    }
                    let cast = self.caster.cast(v, Some(from), Some(&root.id))?;
                    actuate_into(&cast, root, &mut skeleton)?;
                }
            }
            let output = skeleton.into_value();
            self.encode(protocol, content, &output, &mut wire)?;
        }
        debug!(
            category = "marshal",
            service_id = %service.id,
            characteristic_id = %characteristic_id,
            segments = wire.len(),
            "Marshalled inputs"
        );
        Ok(wire)
    }

    /// Value of a configurable, built on the characteristic's skeleton.
    fn configurable_value(&self, configurable: &Configurable) -> Result<Value> {
        let characteristic = self
            .repository
            .get_characteristic(&configurable.characteristic_id)?;
        let mut skeleton = Skeleton::build(characteristic.as_ref());
        for entry in &configurable.values {
            let node = characteristic.descend(&entry.path).ok_or_else(|| {
                MarshallerError::path_not_found(join_path(&characteristic.name, &entry.path))
            })?;
            let primitive = node.primitive_type().ok_or_else(|| {
                MarshallerError::Validation(format!(
                    "configurable path '{}' of '{}' is not a primitive",
                    entry.path, characteristic.id
                ))
            })?;
            let parsed = parse_scalar(&entry.value, primitive)?;
            if let Some(slot) = skeleton.slot(&node.id) {
                skeleton.set(slot, &parsed)?;
            }
        }
        Ok(skeleton.into_value())
    }

    /// Unmarshal the output of `service` that best matches
    /// `characteristic_id`'s concept and cast it.
    ///
    /// Outputs whose path lies within an earlier `hints` entry are preferred;
    /// otherwise the first bound output in declaration order wins.
    pub fn unmarshal_outputs(
        &self,
        protocol: &Protocol,
        service: &Service,
        wire: &WireMap,
        characteristic_id: &str,
        path_allow_list: &[String],
        hints: &[String],
    ) -> Result<Value> {
        protocol.check_service(service)?;
        let concept = self.repository.get_concept_of_characteristic(characteristic_id)?;

        let mut bound: Vec<(usize, String, String)> = Vec::new();
        for (content_index, content) in service.outputs.iter().enumerate() {
            let segment = protocol.segment_name(&content.protocol_segment_id)?;
            if !wire.contains_key(segment) {
                continue;
            }
            content.root.walk(&mut |node, path| {
                if let Some(id) = &node.characteristic_id {
                    if allowed(path_allow_list, path) {
                        bound.push((content_index, path.to_string(), id.clone()));
                    }
                }
            });
        }

        let mut candidates = Vec::new();
        for (content_index, path, id) in bound {
            let root_id = self.repository.get_root_characteristic_id(&id)?;
            if self.repository.get_concept_of_characteristic(&root_id)?.id != concept.id {
                continue;
            }
            let hint_rank = hints
                .iter()
                .position(|hint| is_within(&path, hint))
                .unwrap_or(hints.len());
            candidates.push(Candidate {
                content_index,
                path,
                characteristic_id: id,
                root_id,
                hint_rank,
            });
        }
        candidates.sort_by_key(|c| c.hint_rank);
        let chosen = candidates.first().ok_or_else(|| {
            MarshallerError::not_found("output for characteristic", characteristic_id)
        })?;

        let content = &service.outputs[chosen.content_index];
        let segment = protocol.segment_name(&content.protocol_segment_id)?;
        let text = wire
            .get(segment)
            .ok_or_else(|| MarshallerError::not_found("segment", segment))?;
        let decoded = self
            .codecs
            .get(&content.serialization)?
            .unmarshal(text, &content.root)?;

        let root = self.repository.get_characteristic(&chosen.root_id)?;
        let anchor = anchor_path(chosen, &candidates);
        debug!(
            category = "unmarshal",
            service_id = %service.id,
            path = %chosen.path,
            anchor = %anchor,
            root_id = %chosen.root_id,
            "Selected output"
        );
        let value = sensor_filtered(&decoded, &content.root, &root, &|path: &str| {
            allowed(path_allow_list, path) && is_within(path, &anchor)
        })?;
        self.caster.cast(&value, Some(&chosen.root_id), Some(characteristic_id))
    }

    /// Marshal values addressed by explicit paths or by function and aspect.
    pub fn marshal_v2(
        &self,
        protocol: &Protocol,
        service: &Service,
        inputs: &[MarshallingInput],
    ) -> Result<WireMap> {
        protocol.check_service(service)?;
        let mut contents = service.inputs.clone();

        for input in inputs {
            let paths = self.resolve_paths(&contents, input)?;
            for path in paths {
                let node = contents
                    .iter_mut()
                    .find_map(|c| c.root.find_by_path_mut(&path))
                    .ok_or_else(|| MarshallerError::path_not_found(&path))?;
                let literal = self.prepare_literal(input, node)?;
                debug!(category = "marshal", path = %path, "Set literal");
                node.value = Some(literal);
            }
        }

        let mut wire = WireMap::new();
        for content in &contents {
            let value = flatten(&content.root, &content.root.name)?;
            self.encode(protocol, content, &value, &mut wire)?;
        }
        Ok(wire)
    }

    fn resolve_paths(&self, contents: &[Content], input: &MarshallingInput) -> Result<Vec<String>> {
        if !input.paths.is_empty() {
            return Ok(input.paths.clone());
        }
        let function_id = input.function_id.as_deref().ok_or_else(|| {
            MarshallerError::Validation("input needs target paths or a function id".to_string())
        })?;
        let aspect = input
            .aspect_node_id
            .as_deref()
            .map(|id| self.repository.get_aspect_node(id))
            .transpose()?;
        let paths: Vec<String> = paths_for(contents, Some(function_id), aspect.as_deref())
            .into_iter()
            .map(|m| m.path)
            .collect();
        if paths.is_empty() {
            return Err(MarshallerError::not_found("path for function", function_id));
        }
        Ok(paths)
    }

    /// Characteristic a content node is addressed by: its own binding, or
    /// the single root characteristic its descendants are bound to.
    fn target_characteristic(&self, node: &ContentVariable) -> Result<Option<String>> {
        if let Some(id) = &node.characteristic_id {
            return Ok(Some(id.clone()));
        }
        if matches!(node.kind, Kind::Primitive(_)) {
            return Ok(None);
        }
        let mut roots: Vec<String> = Vec::new();
        for id in node.characteristic_ids() {
            let root = self.repository.get_root_characteristic_id(&id)?;
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        Ok(match roots.len() {
            1 => roots.pop(),
            _ => None,
        })
    }

    /// Extension chain of the concept behind `function_id`. A function
    /// without a concept has none; an unknown function or concept is an
    /// error.
    fn extensions_of(&self, function_id: Option<&str>) -> Result<Vec<ConverterExtension>> {
        let Some(function_id) = function_id else {
            return Ok(Vec::new());
        };
        let function = self.repository.get_function(function_id)?;
        match &function.concept_id {
            Some(concept_id) => Ok(self.repository.get_concept(concept_id)?.conversions.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn prepare_literal(&self, input: &MarshallingInput, node: &ContentVariable) -> Result<Value> {
        let target = self.target_characteristic(node)?;
        let from = input.characteristic_id.as_deref();
        let function_id = input.function_id.as_deref().or(node.function_id.as_deref());
        let extensions = self.extensions_of(function_id)?;
        let value = self
            .caster
            .cast_with_extensions(&input.value, from, target.as_deref(), &extensions)?;

        match (&node.kind, target) {
            (Kind::Primitive(_), _) | (_, None) => Ok(normalize_deep(&value)),
            (_, Some(id)) => {
                let characteristic = self.repository.get_characteristic(&id)?;
                actuator(&value, &characteristic, node)
            }
        }
    }

    /// Unmarshal the value at `path` and cast it to `characteristic_id`.
    pub fn unmarshal_v2(
        &self,
        protocol: &Protocol,
        service: &Service,
        characteristic_id: Option<&str>,
        path: &str,
        wire: &WireMap,
    ) -> Result<Value> {
        protocol.check_service(service)?;
        let root_name = path.split('.').next().unwrap_or_default();

        for content in &service.outputs {
            if content.root.name != root_name {
                continue;
            }
            let segment = protocol.segment_name(&content.protocol_segment_id)?;
            let Some(text) = wire.get(segment) else {
                continue;
            };
            let decoded = self
                .codecs
                .get(&content.serialization)?
                .unmarshal(text, &content.root)?;
            let mut index = HashMap::new();
            index_values(&decoded, &content.root, content.root.name.clone(), &mut index);
            if let Some((value, node)) = index.get(path) {
                return self.finish_unmarshal(value, node, characteristic_id);
            }
        }

        match self.missing_path {
            MissingPathPolicy::Null => {
                debug!(category = "unmarshal", path = %path, "Path absent, returning null");
                Ok(Value::Null)
            }
            MissingPathPolicy::Error => Err(MarshallerError::path_not_found(path)),
        }
    }

    fn finish_unmarshal(
        &self,
        value: &Value,
        node: &ContentVariable,
        to: Option<&str>,
    ) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let from = self.target_characteristic(node)?;
        let projected = match (&node.kind, from.as_deref()) {
            (Kind::Primitive(_), _) | (_, None) => normalize_deep(value),
            (_, Some(id)) => {
                let characteristic = self.repository.get_characteristic(id)?;
                sensor(value, node, &characteristic)?
            }
        };
        let extensions = self.extensions_of(node.function_id.as_deref())?;
        self.caster
            .cast_with_extensions(&projected, from.as_deref(), to, &extensions)
    }

    fn encode(
        &self,
        protocol: &Protocol,
        content: &Content,
        value: &Value,
        wire: &mut WireMap,
    ) -> Result<()> {
        let codec = self.codecs.get(&content.serialization)?;
        let text = codec.marshal(value, &content.root)?;
        let segment = protocol.segment_name(&content.protocol_segment_id)?;
        if wire.insert(segment.to_string(), text).is_some() {
            warn!(
                category = "marshal",
                segment = %segment,
                "Several contents target one segment, keeping the last"
            );
        }
        Ok(())
    }
}

/// Longest common dotted prefix of two paths.
fn common_ancestor(a: &str, b: &str) -> String {
    a.split('.')
        .zip(b.split('.'))
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect::<Vec<_>>()
        .join(".")
}

/// Subtree the chosen output is read from.
///
/// An output bound to the root characteristic is read alone. An output bound
/// to a part of the root widens to the common ancestor of the nearest outputs
/// of the same content and root that carry the other parts; each part is
/// taken once, so a second device of the same shape stays outside.
fn anchor_path(chosen: &Candidate, candidates: &[Candidate]) -> String {
    if chosen.characteristic_id == chosen.root_id {
        return chosen.path.clone();
    }
    let mut siblings: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            c.content_index == chosen.content_index
                && c.root_id == chosen.root_id
                && c.characteristic_id != c.root_id
                && c.path != chosen.path
        })
        .collect();
    siblings.sort_by_key(|c| Reverse(common_ancestor(&chosen.path, &c.path).len()));

    let mut covered = vec![chosen.characteristic_id.as_str()];
    let mut anchor = chosen.path.clone();
    for sibling in siblings {
        if covered.contains(&sibling.characteristic_id.as_str()) {
            continue;
        }
        covered.push(&sibling.characteristic_id);
        anchor = common_ancestor(&anchor, &sibling.path);
    }
    anchor
}

/// Generic value of a content tree after literals have been set: a node's
/// literal wins, a lone `*` list element becomes a one-element list.
fn flatten(node: &ContentVariable, path: &str) -> Result<Value> {
    if let Kind::Primitive(p) = node.kind {
        return match &node.value {
            None => Ok(p.zero()),
            Some(v) if p.accepts(v) => Ok(normalize_number(v)),
            Some(v) => Err(MarshallerError::type_mismatch(path, p.label(), v)),
        };
    }
    if let Some(v) = &node.value {
        return Ok(normalize_deep(v));
    }
    Ok(match &node.kind {
        Kind::Structure(children) => {
            let mut fields = Map::new();
            for child in children.iter().filter(|c| !c.is_void) {
                fields.insert(child.name.clone(), flatten(child, &join_path(path, &child.name))?);
            }
            Value::Object(fields)
        }
        Kind::List(children) => Value::Array(
            children
                .iter()
                .filter(|c| !c.is_void)
                .map(|c| flatten(c, &join_path(path, &c.name)))
                .collect::<Result<Vec<_>>>()?,
        ),
        Kind::VariableLength {
            container: Container::List,
            element,
        } => Value::Array(vec![flatten(element, &join_path(path, &element.name))?]),
        Kind::VariableLength {
            container: Container::Map,
            ..
        } => Value::Object(Map::new()),
        Kind::Primitive(p) => p.zero(),
    })
}

/// Index every reachable sub-value by dotted path. Variable-length entries
/// are indexed by runtime key or position, and the first entry also under
/// the `*` placeholder.
fn index_values<'v, 'c>(
    value: &'v Value,
    node: &'c ContentVariable,
    path: String,
    index: &mut HashMap<String, (&'v Value, &'c ContentVariable)>,
) {
    match (&node.kind, value) {
        (Kind::Structure(children), Value::Object(fields)) => {
            for child in children {
                if let Some(v) = fields.get(&child.name) {
                    index_values(v, child, join_path(&path, &child.name), index);
                }
            }
        }
        (Kind::List(children), Value::Array(items)) => {
            for (i, (child, v)) in children.iter().zip(items).enumerate() {
                let by_position = join_path(&path, &i.to_string());
                if child.name != i.to_string() {
                    index_values(v, child, join_path(&path, &child.name), index);
                }
                index_values(v, child, by_position, index);
            }
        }
        (Kind::VariableLength { element, .. }, Value::Array(items)) => {
            for (i, v) in items.iter().enumerate() {
                if i == 0 {
                    index_values(v, element, join_path(&path, marshaller_core::PLACEHOLDER), index);
                }
                index_values(v, element, join_path(&path, &i.to_string()), index);
            }
        }
        (Kind::VariableLength { element, .. }, Value::Object(fields)) => {
            for (i, (key, v)) in fields.iter().enumerate() {
                if i == 0 {
                    index_values(v, element, join_path(&path, marshaller_core::PLACEHOLDER), index);
                }
                index_values(v, element, join_path(&path, key), index);
            }
        }
        _ => {}
    }
    index.insert(path, (value, node));
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshaller_core::PrimitiveType;
    use serde_json::json;

    fn candidate(path: &str, characteristic_id: &str) -> Candidate {
        Candidate {
            content_index: 0,
            path: path.to_string(),
            characteristic_id: characteristic_id.to_string(),
            root_id: "rgb".to_string(),
            hint_rank: 0,
        }
    }

    #[test]
    fn test_common_ancestor() {
        assert_eq!(common_ancestor("value.a.b.red", "value.a.c.green"), "value.a");
        assert_eq!(common_ancestor("value.color", "value.color"), "value.color");
        assert_eq!(common_ancestor("value", "other"), "");
    }

    #[test]
    fn test_anchor_stops_at_second_device() {
        let candidates = vec![
            candidate("value.lamps.one.red", "rgb.r"),
            candidate("value.lamps.two.red", "rgb.r"),
            candidate("value.lamps.two.green", "rgb.g"),
            candidate("value.lamps.one.green", "rgb.g"),
        ];
        assert_eq!(anchor_path(&candidates[0], &candidates), "value.lamps.one");
        assert_eq!(anchor_path(&candidates[1], &candidates), "value.lamps.two");

        let whole = candidate("value.color", "rgb");
        assert_eq!(anchor_path(&whole, &candidates), "value.color");
    }

    #[test]
    fn test_flatten_unwraps_placeholder_list() {
        let mut root = ContentVariable::structure(
            "root",
            "value",
            vec![
                ContentVariable::variable_length(
                    "list",
                    "levels",
                    Container::List,
                    ContentVariable::primitive("item", "*", PrimitiveType::Float),
                ),
                ContentVariable::variable_length(
                    "map",
                    "rooms",
                    Container::Map,
                    ContentVariable::primitive("room", "*", PrimitiveType::Float),
                ),
                ContentVariable::primitive("skip", "skip", PrimitiveType::String).void(),
            ],
        );
        root.find_by_path_mut("value.levels.*").unwrap().value = Some(json!(3.0));
        assert_eq!(
            flatten(&root, "value").unwrap(),
            json!({"levels": [3], "rooms": {}})
        );
    }

    #[test]
    fn test_flatten_rejects_wrong_literal() {
        let node = ContentVariable::primitive("l", "level", PrimitiveType::Float)
            .with_value(json!("warm"));
        assert!(matches!(
            flatten(&node, "level"),
            Err(MarshallerError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_index_covers_every_list_entry() {
        let root = ContentVariable::structure(
            "root",
            "value",
            vec![ContentVariable::variable_length(
                "list",
                "list",
                Container::List,
                ContentVariable::primitive("item", "*", PrimitiveType::Integer),
            )],
        );
        let decoded = json!({"list": [10, 11, 12]});
        let mut index = HashMap::new();
        index_values(&decoded, &root, "value".to_string(), &mut index);
        for (i, expected) in [10, 11, 12].iter().enumerate() {
            let (v, node) = index[&format!("value.list.{}", i)];
            assert_eq!(v, &json!(expected));
            assert_eq!(node.id, "item");
        }
        assert_eq!(index["value.list.*"].0, &json!(10));
        assert!(!index.contains_key("value.list.3"));
    }
}
