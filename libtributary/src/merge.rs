//! Recursive in-place deep merge of partial updates.
//!
//! A partial update carries only the fields that changed. Merging walks
//! both trees together: objects merge key by key, arrays and scalars
//! replace the target value wholesale, and an explicit JSON `null` at a
//! key removes that key from the target. Absent keys leave the target
//! untouched.

use serde_json::{Map, Value};

/// Merge `source` into `target` in place.
///
/// Both values must be objects for anything to happen; any other shape at
/// the top level is ignored, matching the container's tolerance of
/// malformed partials.
pub fn merge(target: &mut Value, source: Value) {
    if let (Value::Object(dst), Value::Object(src)) = (target, source) {
        merge_objects(dst, src);
    }
}

/// Merge several sources into `target`, left to right.
///
/// Later sources win on conflicting scalar leaves.
pub fn merge_all(target: &mut Value, sources: impl IntoIterator<Item = Value>) {
    for source in sources {
        merge(target, source);
    }
}

fn merge_objects(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, incoming) in source {
        match incoming {
            // Explicit null deletes the key.
            Value::Null => {
                target.remove(&key);
            }
            Value::Object(src) => match target.get_mut(&key) {
                Some(Value::Object(dst)) => merge_objects(dst, src),
                // Non-object (or missing) target: rebuild the subtree from
                // empty so nulls inside it simply vanish.
                _ => {
                    let mut fresh = Map::new();
                    merge_objects(&mut fresh, src);
                    target.insert(key, Value::Object(fresh));
                }
            },
            // Arrays and scalars replace wholesale.
            other => {
                target.insert(key, other);
            }
        }
    }
}
