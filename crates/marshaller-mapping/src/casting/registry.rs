//! Per-concept cast function registry.
//!
//! Each concept registers two directional tables: characteristic → base
//! (canonical) and base → characteristic. A cast A → B runs A → base → B,
//! so a concept needs two functions per member instead of one per pair.

use marshaller_core::{MarshallerError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One direction of a cast.
pub type CastFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
struct ConceptCasts {
    base_characteristic_id: String,
    to_base: HashMap<String, CastFn>,
    from_base: HashMap<String, CastFn>,
}

#[derive(Clone, Default)]
pub struct CastRegistry {
    concepts: HashMap<String, ConceptCasts>,
}

impl CastRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `concept_id` with its base characteristic. Casting to or from
    /// the base itself is the identity.
    pub fn register_concept(
        &mut self,
        concept_id: impl Into<String>,
        base_characteristic_id: impl Into<String>,
    ) {
        let concept_id = concept_id.into();
        let base_characteristic_id = base_characteristic_id.into();
        debug!(
            category = "casting",
            concept_id = %concept_id,
            base = %base_characteristic_id,
            "Registered cast concept"
        );
        self.concepts.insert(
            concept_id,
            ConceptCasts {
                base_characteristic_id,
                to_base: HashMap::new(),
                from_base: HashMap::new(),
            },
        );
    }

    /// Register both directions for one member characteristic.
    pub fn register<T, F>(
        &mut self,
        concept_id: &str,
        characteristic_id: impl Into<String>,
        to_base: T,
        from_base: F,
    ) -> Result<()>
    where
        T: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        let casts = self.concepts.get_mut(concept_id).ok_or_else(|| {
            MarshallerError::Cast(format!("concept '{}' is not registered", concept_id))
        })?;
        let characteristic_id = characteristic_id.into();
        casts.to_base.insert(characteristic_id.clone(), Arc::new(to_base));
        casts.from_base.insert(characteristic_id, Arc::new(from_base));
        Ok(())
    }

    pub fn contains_concept(&self, concept_id: &str) -> bool {
        self.concepts.contains_key(concept_id)
    }

    pub fn base_of(&self, concept_id: &str) -> Option<&str> {
        self.concepts
            .get(concept_id)
            .map(|c| c.base_characteristic_id.as_str())
    }

    /// Cast between two top-level characteristics of `concept_id`.
    pub fn cast(&self, concept_id: &str, value: &Value, from: &str, to: &str) -> Result<Value> {
        if from == to {
            return Ok(value.clone());
        }
        let casts = self.concepts.get(concept_id).ok_or_else(|| {
            MarshallerError::Cast(format!("no casts registered for concept '{}'", concept_id))
        })?;
        let base = casts.base_characteristic_id.as_str();

        let canonical = if from == base {
            value.clone()
        } else {
            let f = casts.to_base.get(from).ok_or_else(|| {
                MarshallerError::Cast(format!("no cast from '{}' to '{}'", from, base))
            })?;
            f(value)?
        };
        if to == base {
            return Ok(canonical);
        }
        let f = casts.from_base.get(to).ok_or_else(|| {
            MarshallerError::Cast(format!("no cast from '{}' to '{}'", base, to))
        })?;
        f(&canonical)
    }
}
