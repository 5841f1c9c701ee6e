//! Configurable finder.
//!
//! A concept is configurable for a set of services when every one of them
//! accepts an input bound to it. The caller then offers the concept's base
//! characteristic, flattened into editable leaves, as extra input.

use marshaller_concepts::ConceptRepository;
use marshaller_core::value::render_scalar;
use marshaller_core::{
    Characteristic, Configurable, ConfigurableValue, Kind, MarshallerError, Result, SchemaNode,
    Service,
};
use std::collections::HashSet;
use tracing::debug;

use crate::marshal::Marshaller;

/// Concepts referenced by the inputs of every service in `services`, other
/// than the concept of `excluded_characteristic_id`, in first-seen order.
pub fn find_configurables(
    repository: &ConceptRepository,
    excluded_characteristic_id: &str,
    services: &[Service],
) -> Result<Vec<Configurable>> {
    let excluded = repository.get_concept_of_characteristic(excluded_characteristic_id)?;
    let total: HashSet<&str> = services.iter().map(|s| s.id.as_str()).collect();

    // concept id -> services referencing it, ordered by first reference
    let mut index: Vec<(String, HashSet<&str>)> = Vec::new();
    for service in services {
        for content in &service.inputs {
            for id in content.root.characteristic_ids() {
                let concept = repository.get_concept_of_characteristic(&id)?;
                match index.iter_mut().find(|(c, _)| *c == concept.id) {
                    Some((_, users)) => {
                        users.insert(service.id.as_str());
                    }
                    None => index.push((concept.id.clone(), HashSet::from([service.id.as_str()]))),
                }
            }
        }
    }

    let mut configurables = Vec::new();
    for (concept_id, users) in index {
        if concept_id == excluded.id || users.len() != total.len() {
            continue;
        }
        let concept = repository.get_concept(&concept_id)?;
        let base_id = concept
            .base_characteristic_id
            .as_deref()
            .or_else(|| concept.characteristic_ids.first().map(String::as_str))
            .ok_or_else(|| {
                MarshallerError::Validation(format!(
                    "concept '{}' has no characteristics",
                    concept.id
                ))
            })?;
        let base = repository.get_characteristic(base_id)?;
        configurables.push(Configurable {
            characteristic_id: base.id.clone(),
            values: default_values(&base),
        });
    }
    debug!(
        category = "configurables",
        services = services.len(),
        found = configurables.len(),
        "Found configurables"
    );
    Ok(configurables)
}

/// One entry per primitive leaf: its path below the root, its name and its
/// default rendered as text.
fn default_values(characteristic: &Characteristic) -> Vec<ConfigurableValue> {
    if let Kind::Primitive(p) = characteristic.kind {
        let value = characteristic.literal().cloned().unwrap_or_else(|| p.zero());
        return vec![ConfigurableValue::new("", characteristic.name.clone(), render_scalar(&value))];
    }
    let mut values = Vec::new();
    let mut push = |node: &Characteristic, path: &str| {
        if let Kind::Primitive(p) = node.kind {
            let value = node.literal().cloned().unwrap_or_else(|| p.zero());
            values.push(ConfigurableValue::new(path, node.name.clone(), render_scalar(&value)));
        }
    };
    marshaller_core::model::schema::visit_descendants(characteristic, &mut push);
    values
}

impl Marshaller {
    pub fn find_configurables(
        &self,
        excluded_characteristic_id: &str,
        services: &[Service],
    ) -> Result<Vec<Configurable>> {
        find_configurables(self.repository(), excluded_characteristic_id, services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshaller_concepts::fixtures::ids;
    use marshaller_core::PrimitiveType;
    use serde_json::json;

    #[test]
    fn test_defaults_use_literal_or_zero() {
        let characteristic = Characteristic::structure(
            "c",
            "setting",
            vec![
                Characteristic::primitive("c.level", "level", PrimitiveType::Float)
                    .with_value(json!(2.5)),
                Characteristic::primitive("c.mode", "mode", PrimitiveType::String),
                Characteristic::primitive("c.on", "on", PrimitiveType::Boolean),
            ],
        );
        let values = default_values(&characteristic);
        assert_eq!(
            values,
            vec![
                ConfigurableValue::new("level", "level", "2.5"),
                ConfigurableValue::new("mode", "mode", ""),
                ConfigurableValue::new("on", "on", "false"),
            ]
        );
    }

    #[test]
    fn test_primitive_base_has_empty_path() {
        let celsius = Characteristic::primitive(ids::CELSIUS, "celsius", PrimitiveType::Float);
        assert_eq!(default_values(&celsius), vec![ConfigurableValue::new("", "celsius", "0")]);
    }
}
