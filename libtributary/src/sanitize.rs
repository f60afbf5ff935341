//! Per-field sanitization of partial updates.
//!
//! A [`Sanitizers`] tree mirrors the shape of state; its leaves are pure
//! `Value -> Value` transforms. [`sanitize`] walks an incoming partial
//! update and applies the transform wherever the update supplies a
//! present, non-null value at a matching path. Fields without a matching
//! leaf pass through unchanged. Every commit runs this before merging, so
//! canonical state never observes an unsanitized value.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::path::Path;

/// A pure per-field transform.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Clone)]
enum Node {
    Leaf(Transform),
    Branch(HashMap<String, Node>),
}

/// A tree of per-field transforms, shape-isomorphic to a subset of state.
#[derive(Clone, Default)]
pub struct Sanitizers {
    nodes: HashMap<String, Node>,
}

impl Sanitizers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transform at a dotted path, e.g. `person.first`.
    ///
    /// A transform registered at an existing path replaces it. Unparseable
    /// names are ignored, consistent with the container's tolerance of
    /// malformed input.
    pub fn with<F>(mut self, name: &str, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        match Path::parse(name) {
            Ok(path) => self.insert(&path, Arc::new(transform)),
            Err(err) => debug!(name, %err, "ignoring sanitizer with invalid path"),
        }
        self
    }

    fn insert(&mut self, path: &Path, transform: Transform) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };
        let mut nodes = &mut self.nodes;
        for segment in parents {
            let entry = nodes
                .entry(segment.clone())
                .or_insert_with(|| Node::Branch(HashMap::new()));
            // A deeper registration converts an existing leaf into a branch.
            if matches!(entry, Node::Leaf(_)) {
                *entry = Node::Branch(HashMap::new());
            }
            let Node::Branch(children) = entry else {
                return;
            };
            nodes = children;
        }
        nodes.insert(last.clone(), Node::Leaf(transform));
    }

    /// Overlay another tree onto this one; `other`'s leaves win where the
    /// trees collide.
    pub fn extend(&mut self, other: Sanitizers) {
        extend_nodes(&mut self.nodes, other.nodes);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn extend_nodes(target: &mut HashMap<String, Node>, source: HashMap<String, Node>) {
    for (key, incoming) in source {
        match (target.get_mut(&key), incoming) {
            (Some(Node::Branch(dst)), Node::Branch(src)) => extend_nodes(dst, src),
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

/// Apply the sanitizer tree to `data` in place.
pub fn sanitize(data: &mut Value, sanitizers: &Sanitizers) {
    if let Value::Object(map) = data {
        sanitize_map(map, &sanitizers.nodes);
    }
}

fn sanitize_map(values: &mut serde_json::Map<String, Value>, nodes: &HashMap<String, Node>) {
    for (key, value) in values.iter_mut() {
        match nodes.get(key) {
            Some(Node::Leaf(transform)) if !value.is_null() => {
                *value = transform(value.take());
            }
            Some(Node::Branch(children)) => {
                if let Value::Object(nested) = value {
                    sanitize_map(nested, children);
                }
            }
            _ => {}
        }
    }
}

/// Replace every `null` leaf in `data` with an empty string, recursively.
///
/// Useful before rendering, where a missing field should display as
/// nothing rather than `null`. Not applied implicitly by commit; callers
/// who want blank-substitution instead of key deletion run this on a
/// partial before committing it.
pub fn emptize(data: &mut Value) {
    match data {
        Value::Object(map) => {
            for value in map.values_mut() {
                if value.is_null() {
                    *value = Value::String(String::new());
                } else {
                    emptize(value);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                if item.is_null() {
                    *item = Value::String(String::new());
                } else {
                    emptize(item);
                }
            }
        }
        _ => {}
    }
}
