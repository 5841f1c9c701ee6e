//! Immutable concept index built from one registry fetch.
//!
//! Only top-level characteristics carry concept membership. Every nested
//! characteristic id is mapped to its top-level ancestor ("root"), and the
//! root to its concept, so membership of any node is two map lookups.

use marshaller_core::{AspectNode, Characteristic, Concept, Function};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Counts reported after a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub concepts: usize,
    pub characteristics: usize,
    pub functions: usize,
    pub aspects: usize,
}

#[derive(Debug, Default)]
pub struct ConceptSnapshot {
    pub(crate) concepts: HashMap<String, Arc<Concept>>,
    /// Every characteristic id, top-level or nested, to its subtree.
    pub(crate) characteristics: HashMap<String, Arc<Characteristic>>,
    /// Characteristic id to top-level characteristic id.
    pub(crate) root_of: HashMap<String, String>,
    /// Top-level characteristic id to concept id.
    pub(crate) concept_of: HashMap<String, String>,
    pub(crate) functions: HashMap<String, Arc<Function>>,
    pub(crate) aspects: HashMap<String, Arc<AspectNode>>,
}

impl ConceptSnapshot {
    /// Build the index. `characteristics` are the top-level characteristics
    /// listed by the concepts; ids no concept lists are dropped.
    pub fn build(
        concepts: Vec<Concept>,
        characteristics: Vec<Characteristic>,
        functions: Vec<Function>,
        aspects: Vec<AspectNode>,
    ) -> Self {
        let mut top_level: HashMap<String, Characteristic> = characteristics
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        let mut snapshot = Self::default();

        for concept in concepts {
            for characteristic_id in &concept.characteristic_ids {
                if let Some(owner) = snapshot.concept_of.get(characteristic_id) {
                    warn!(
                        category = "concepts",
                        characteristic_id = %characteristic_id,
                        concept_id = %concept.id,
                        owner = %owner,
                        "Characteristic already registered by another concept, keeping first"
                    );
                    continue;
                }
                let Some(root) = top_level.remove(characteristic_id) else {
                    warn!(
                        category = "concepts",
                        characteristic_id = %characteristic_id,
                        concept_id = %concept.id,
                        "Concept lists a characteristic that was not fetched"
                    );
                    continue;
                };
                snapshot.register_root(&concept.id, root);
            }
            snapshot
                .concepts
                .insert(concept.id.clone(), Arc::new(concept));
        }

        snapshot.functions = functions
            .into_iter()
            .map(|f| (f.id.clone(), Arc::new(f)))
            .collect();
        snapshot.aspects = aspects
            .into_iter()
            .map(|a| (a.id.clone(), Arc::new(a)))
            .collect();
        snapshot
    }

    fn register_root(&mut self, concept_id: &str, root: Characteristic) {
        for descendant in root.descendants() {
            self.root_of.insert(descendant.id.clone(), root.id.clone());
            self.characteristics
                .insert(descendant.id.clone(), Arc::new(descendant.clone()));
        }
        self.root_of.insert(root.id.clone(), root.id.clone());
        self.concept_of
            .insert(root.id.clone(), concept_id.to_string());
        self.characteristics.insert(root.id.clone(), Arc::new(root));
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            concepts: self.concepts.len(),
            characteristics: self.characteristics.len(),
            functions: self.functions.len(),
            aspects: self.aspects.len(),
        }
    }
}
