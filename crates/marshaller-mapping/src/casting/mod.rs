//! Characteristic-to-characteristic casting within a concept.
//!
//! The in-process [`CastRegistry`] is the only cast strategy; there is no
//! remote conversion service.

pub mod builtin;
pub mod extensions;
pub mod registry;

pub use registry::{CastFn, CastRegistry};

use marshaller_concepts::ConceptRepository;
use marshaller_core::{ConverterExtension, MarshallerError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Casts values between characteristic ids using the concept repository to
/// find owning concepts.
#[derive(Clone)]
pub struct Caster {
    repository: Arc<ConceptRepository>,
    registry: Arc<CastRegistry>,
}

fn cast_error(e: MarshallerError, id: &str) -> MarshallerError {
    match e {
        MarshallerError::Cast(_) => e,
        other => MarshallerError::Cast(format!("cannot resolve '{}': {}", id, other)),
    }
}

impl Caster {
    pub fn new(repository: Arc<ConceptRepository>, registry: Arc<CastRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    pub fn repository(&self) -> &Arc<ConceptRepository> {
        &self.repository
    }

    /// Cast `value` from one characteristic to another of the same concept.
    ///
    /// Two unset ids, or identical ids, return the value unchanged without
    /// any lookup. Casting into a nested characteristic casts into its root
    /// and projects the sub-value.
    pub fn cast(&self, value: &Value, from: Option<&str>, to: Option<&str>) -> Result<Value> {
        let (from, to) = match (from, to) {
            (None, None) => return Ok(value.clone()),
            (Some(from), Some(to)) if from == to => return Ok(value.clone()),
            (Some(from), Some(to)) => (from, to),
            (from, to) => {
                return Err(MarshallerError::Cast(format!(
                    "cannot cast from {} to {}",
                    from.unwrap_or("<unset>"),
                    to.unwrap_or("<unset>")
                )))
            }
        };

        let from_root = self
            .repository
            .get_root_characteristic_id(from)
            .map_err(|e| cast_error(e, from))?;
        let to_root = self
            .repository
            .get_root_characteristic_id(to)
            .map_err(|e| cast_error(e, to))?;
        let from_concept = self
            .repository
            .get_concept_of_characteristic(from)
            .map_err(|e| cast_error(e, from))?;
        let to_concept = self
            .repository
            .get_concept_of_characteristic(to)
            .map_err(|e| cast_error(e, to))?;
        if from_concept.id != to_concept.id {
            return Err(MarshallerError::Cast(format!(
                "'{}' ({}) and '{}' ({}) belong to different concepts",
                from, from_concept.id, to, to_concept.id
            )));
        }
        if from_root != from {
            return Err(MarshallerError::Cast(format!(
                "cannot cast from nested characteristic '{}'",
                from
            )));
        }

        trace!(
            category = "casting",
            from = %from,
            to = %to,
            concept_id = %from_concept.id,
            "Casting"
        );
        let cast = self.registry.cast(&from_concept.id, value, &from_root, &to_root)?;
        if to_root == to {
            return Ok(cast);
        }
        self.project(&cast, &to_root, to)
    }

    /// Cast along the concept's extension chain when one connects the two
    /// ids, falling back to [`Caster::cast`].
    pub fn cast_with_extensions(
        &self,
        value: &Value,
        from: Option<&str>,
        to: Option<&str>,
        extensions: &[ConverterExtension],
    ) -> Result<Value> {
        if let (Some(f), Some(t)) = (from, to) {
            if let Some(chain) = extensions::find_chain(extensions, f, t) {
                if !chain.is_empty() {
                    debug!(
                        category = "casting",
                        from = %f,
                        to = %t,
                        steps = chain.len(),
                        "Using extension chain"
                    );
                    return extensions::apply_chain(&chain, value);
                }
            }
        }
        self.cast(value, from, to)
    }

    /// Sub-value of a root characteristic value addressed by a nested id.
    fn project(&self, value: &Value, root_id: &str, nested_id: &str) -> Result<Value> {
        let root = self
            .repository
            .get_characteristic(root_id)
            .map_err(|e| cast_error(e, root_id))?;
        let index = root.path_index();
        let path = index.get(nested_id).ok_or_else(|| {
            MarshallerError::Cast(format!("'{}' is not below '{}'", nested_id, root_id))
        })?;
        path.split('.')
            .try_fold(value, |current, segment| match current {
                Value::Object(fields) => fields.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
            .cloned()
            .ok_or_else(|| {
                MarshallerError::Cast(format!("cast result has no value at '{}'", path))
            })
    }
}
