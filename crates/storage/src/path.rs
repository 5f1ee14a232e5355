// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal path-filter selection over a JSON content tree.
//!
//! The path-filter expression language itself is a named external
//! collaborator (spec Non-goals: "the schema language"); this is the
//! smallest implementation of the contract `get`/`put` need: a `/`-joined
//! sequence of object keys, where the empty path (or `/`) selects the
//! whole tree.

use serde_json::Value;

/// Select the subtree at `path` out of `tree`. Returns `None` if any
/// segment along the way is absent or not an object.
pub fn select<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = tree;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = node.as_object()?.get(segment)?;
    }
    Some(node)
}

/// Set the subtree at `path` inside `tree` to `value`, creating
/// intermediate objects as needed.
pub fn set_at(tree: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        *tree = value;
        return;
    }
    let mut node = tree;
    for segment in &segments[..segments.len() - 1] {
        if !node.is_object() {
            *node = Value::Object(serde_json::Map::new());
        }
        let Value::Object(map) = node else { unreachable!("just ensured object") };
        node = map.entry(segment.to_string()).or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !node.is_object() {
        *node = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(segments[segments.len() - 1].to_string(), value);
    }
}

/// Recursively merge `src` into `dst` (the `MERGE` put operation).
pub fn merge(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                merge(dst_map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
        (dst, src) => *dst = src.clone(),
    }
}
