//! Path resolver and aspect ranker.
//!
//! Paths are dotted names accumulated from a content root, e.g.
//! `value.color.red`. Variable-length elements appear as the literal `*`
//! segment in these abstract paths.

use marshaller_core::{AspectNode, Content, ContentVariable};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Aspect match quality: exact aspect, direct child, deeper descendant.
pub mod distance {
    pub const EXACT: usize = 0;
    pub const CHILD: usize = 1;
    pub const DESCENDANT: usize = 2;
}

/// A content variable selected by function and aspect.
#[derive(Debug, Clone)]
pub struct PathMatch<'c> {
    pub path: String,
    pub node: &'c ContentVariable,
    /// Position of the owning content in the searched list.
    pub content_index: usize,
    pub distance: usize,
}

fn aspect_distance(aspect: &AspectNode, tagged: &str) -> Option<usize> {
    if aspect.id == tagged {
        Some(distance::EXACT)
    } else if aspect.is_child(tagged) {
        Some(distance::CHILD)
    } else if aspect.is_descendant(tagged) {
        Some(distance::DESCENDANT)
    } else {
        None
    }
}

/// Content variables whose function id equals `function_id` (any when
/// `None` or empty) and whose aspect is `aspect`, a child or a descendant
/// of it (any when `None`), ordered by distance then encounter order.
pub fn paths_for<'c>(
    contents: &'c [Content],
    function_id: Option<&str>,
    aspect: Option<&AspectNode>,
) -> Vec<PathMatch<'c>> {
    let function_id = function_id.filter(|f| !f.is_empty());
    let mut matches = Vec::new();
    for (content_index, content) in contents.iter().enumerate() {
        content.root.walk(&mut |node, path| {
            if let Some(wanted) = function_id {
                if node.function_id.as_deref() != Some(wanted) {
                    return;
                }
            }
            let distance = match aspect {
                None => distance::EXACT,
                Some(aspect) => {
                    let own = node.aspect_id.as_deref();
                    match own.and_then(|a| aspect_distance(aspect, a)) {
                        Some(d) => d,
                        None => return,
                    }
                }
            };
            matches.push(PathMatch {
                path: path.to_string(),
                node,
                content_index,
                distance,
            });
        });
    }
    matches.sort_by_key(|m| m.distance);
    matches
}

/// Breadth-first distances from `root` over child links: the root is 0,
/// its children 1, each further level one more. `lookup` resolves ids.
pub fn aspect_distances(
    root: &AspectNode,
    lookup: impl Fn(&str) -> Option<Arc<AspectNode>>,
) -> HashMap<String, usize> {
    let mut distances = HashMap::new();
    distances.insert(root.id.clone(), 0);
    let mut queue: VecDeque<(Vec<String>, usize)> = VecDeque::new();
    queue.push_back((root.child_ids.clone(), 1));
    while let Some((ids, level)) = queue.pop_front() {
        for id in ids {
            if distances.contains_key(&id) {
                continue;
            }
            distances.insert(id.clone(), level);
            if let Some(node) = lookup(&id) {
                queue.push_back((node.child_ids.clone(), level + 1));
            }
        }
    }
    distances
}

/// Stable sort by the distance of each match's own aspect; untagged or
/// unknown aspects go last.
pub fn sort_by_aspect_distance(distances: &HashMap<String, usize>, paths: &mut [PathMatch<'_>]) {
    paths.sort_by_key(|m| {
        m.node
            .aspect_id
            .as_ref()
            .and_then(|a| distances.get(a))
            .copied()
            .unwrap_or(usize::MAX)
    });
}

/// Whether `path` equals `prefix` or lies below it.
pub fn is_within(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.len() > prefix.len()
            && path.starts_with(prefix)
            && path.as_bytes()[prefix.len()] == b'.')
}

/// Whether `path` is covered by an allow list; an empty list allows all.
pub fn allowed(allow_list: &[String], path: &str) -> bool {
    allow_list.is_empty() || allow_list.iter().any(|p| is_within(path, p))
}

/// Drop the root name from a path; the root itself maps to an empty path.
pub fn strip_envelope(path: &str) -> &str {
    path.split_once('.').map(|(_, rest)| rest).unwrap_or("")
}
