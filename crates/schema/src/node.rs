// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single node in the schema tree.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What shape of data a schema node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// A node with named children.
    Container,
    /// A keyed collection of `Container` entries.
    List,
    /// A scalar value.
    Leaf,
}

/// A declarative schema node, as loaded from an HCL schema definition.
///
/// ```hcl
/// node "interfaces" {
///   kind = "container"
///   node "interface" {
///     kind = "list"
///     config = true
///     node "name" { kind = "leaf" }
///     node "oper-status" { kind = "leaf", config = false }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(default)]
    pub kind: Option<NodeKind>,
    /// Whether this node is configuration (`true`, the default) or
    /// state-only (`false`). An `edit-config` payload may never target a
    /// state-only node (§4.2 step 3, scenario S6).
    #[serde(default = "default_config")]
    pub config: bool,
    #[serde(default, rename = "node")]
    pub children: IndexMap<String, SchemaNode>,
}

fn default_config() -> bool {
    true
}

impl SchemaNode {
    pub fn container() -> Self {
        Self { kind: Some(NodeKind::Container), config: true, children: IndexMap::new() }
    }

    pub fn is_state_only(&self) -> bool {
        !self.config
    }

    /// Children in schema declaration order, used to canonicalize the
    /// ordering of an `edit-config` payload's children (§4.2 step 4).
    pub fn child_order(&self) -> Vec<&str> {
        self.children.keys().map(String::as_str).collect()
    }

    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_true() {
        let text = r#"
            node "foo" { kind = "leaf" }
        "#;
        let root: SchemaNode = hcl::from_str(text).unwrap();
        assert!(root.child("foo").unwrap().config);
    }

    #[test]
    fn state_only_leaf_parses() {
        let text = r#"
            node "oper-status" { kind = "leaf", config = false }
        "#;
        let root: SchemaNode = hcl::from_str(text).unwrap();
        assert!(root.child("oper-status").unwrap().is_state_only());
    }

    #[test]
    fn child_order_matches_declaration_order() {
        let text = r#"
            node "b" { kind = "leaf" }
            node "a" { kind = "leaf" }
        "#;
        let root: SchemaNode = hcl::from_str(text).unwrap();
        assert_eq!(root.child_order(), vec!["b", "a"]);
    }
}
