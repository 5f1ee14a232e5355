// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only schema registry: loads once at startup, then only answers
//! lookups (§2 "Schema registry").

use crate::error::SchemaError;
use crate::node::SchemaNode;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    root: SchemaNode,
}

impl SchemaRegistry {
    pub fn from_str(text: &str) -> Result<Self, SchemaError> {
        let root: SchemaNode = hcl::from_str(text)?;
        Ok(Self { root })
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    /// An empty registry: every path binds to an implicit, always-config
    /// container. Used when no schema file is configured, matching the
    /// teacher's permissive defaults for optional subsystems.
    pub fn empty() -> Self {
        Self { root: SchemaNode::container() }
    }

    /// Resolve a `/`-separated path to its schema node, if declared.
    ///
    /// An undeclared path is not an error by itself: it binds loosely
    /// (treated as configuration) the way a schema-less deployment would,
    /// but `is_state_only` below is always authoritative for declared
    /// nodes.
    pub fn bind(&self, path: &str) -> Option<&SchemaNode> {
        let mut node = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Whether `path` is declared as state-only. Undeclared paths are
    /// treated as configuration.
    pub fn is_state_only(&self, path: &str) -> bool {
        self.bind(path).map(SchemaNode::is_state_only).unwrap_or(false)
    }

    /// Schema-declared child order for the node at `path`, if any.
    pub fn child_order(&self, path: &str) -> Option<Vec<&str>> {
        self.bind(path).map(SchemaNode::child_order)
    }

    /// Reorders every object's keys, recursively, to match schema
    /// declaration order (§4.2 `edit-config` step 4: "Canonicalize child
    /// ordering per schema"). Keys with no declared position keep their
    /// existing relative order, appended after every declared key present
    /// in the object.
    pub fn canonicalize(&self, path: &str, value: &mut serde_json::Value) {
        if let serde_json::Value::Object(map) = value {
            if let Some(order) = self.child_order(path) {
                let mut reordered = serde_json::Map::with_capacity(map.len());
                for key in &order {
                    if let Some(v) = map.remove(*key) {
                        reordered.insert((*key).to_string(), v);
                    }
                }
                for (key, v) in map.iter() {
                    reordered.insert(key.clone(), v.clone());
                }
                *map = reordered;
            }
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let child_path = if path.is_empty() { key.clone() } else { format!("{path}/{key}") };
                if let Some(child) = map.get_mut(&key) {
                    self.canonicalize(&child_path, child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaRegistry {
        SchemaRegistry::from_str(
            r#"
            node "interfaces" {
              kind = "container"
              node "interface" {
                kind = "list"
                node "name" { kind = "leaf" }
                node "oper-status" { kind = "leaf", config = false }
              }
            }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn binds_nested_path() {
        let reg = sample();
        assert!(reg.bind("interfaces/interface/name").is_some());
    }

    #[test]
    fn state_only_is_detected_for_declared_nodes() {
        let reg = sample();
        assert!(reg.is_state_only("interfaces/interface/oper-status"));
        assert!(!reg.is_state_only("interfaces/interface/name"));
    }

    #[test]
    fn undeclared_paths_are_treated_as_configuration() {
        let reg = sample();
        assert!(!reg.is_state_only("unknown/path"));
    }

    #[test]
    fn empty_registry_treats_everything_as_configuration() {
        let reg = SchemaRegistry::empty();
        assert!(!reg.is_state_only("anything/at/all"));
    }

    #[test]
    fn canonicalize_reorders_top_level_children_per_schema() {
        let reg = SchemaRegistry::from_str(
            r#"
            node "interfaces" { kind = "container" }
            node "system" { kind = "container" }
            "#,
        )
        .unwrap();
        let mut value = serde_json::json!({"system": {}, "interfaces": {}});
        reg.canonicalize("", &mut value);
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["interfaces", "system"]);
    }

    #[test]
    fn canonicalize_keeps_undeclared_keys_after_declared_ones() {
        let reg = sample();
        let mut value = serde_json::json!({
            "unknown": 1,
            "interfaces": {"interface": {"oper-status": "up", "name": "eth0"}}
        });
        reg.canonicalize("", &mut value);
        let top: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(top, vec!["interfaces", "unknown"]);
        let inner = &value["interfaces"]["interface"];
        let inner_keys: Vec<&str> = inner.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(inner_keys, vec!["name", "oper-status"]);
    }
}
