//! Aspect ontology nodes.

use serde::{Deserialize, Serialize};

/// Node of the aspect tree (e.g. "inside air" below "air").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub root_id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub child_ids: Vec<String>,
    #[serde(default)]
    pub ancestor_ids: Vec<String>,
    #[serde(default)]
    pub descendent_ids: Vec<String>,
}

impl AspectNode {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root_id: id.clone(),
            id,
            name: String::new(),
            parent_id: String::new(),
            child_ids: Vec::new(),
            ancestor_ids: Vec::new(),
            descendent_ids: Vec::new(),
        }
    }

    pub fn is_child(&self, aspect_id: &str) -> bool {
        self.child_ids.iter().any(|c| c == aspect_id)
    }

    pub fn is_descendant(&self, aspect_id: &str) -> bool {
        self.descendent_ids.iter().any(|c| c == aspect_id)
    }
}
