// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `validate(db)` (§4.3): a standalone RPC as well as the first phase of
//! `commit` (§11 "validate as a standalone RPC" — any datastore name, not
//! only `candidate`).

use ncfd_schema::SchemaRegistry;
use serde_json::Value;

/// Result of validating a datastore's content against the schema.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidateReport {
    pub ok: bool,
    pub violations: Vec<String>,
}

impl ValidateReport {
    pub fn ok() -> Self {
        Self { ok: true, violations: Vec::new() }
    }

    pub fn failed(violations: Vec<String>) -> Self {
        Self { ok: false, violations }
    }
}

/// Walks `content` and reports every node bound to a schema-declared
/// state-only path: a configuration datastore may never hold state data
/// (§4.2 `edit-config` step 3, generalized to whole-tree validation).
pub fn validate_tree(schema: &SchemaRegistry, content: &Value) -> ValidateReport {
    let mut violations = Vec::new();
    walk(schema, content, "", &mut violations);
    if violations.is_empty() {
        ValidateReport::ok()
    } else {
        ValidateReport::failed(violations)
    }
}

fn walk(schema: &SchemaRegistry, node: &Value, path: &str, violations: &mut Vec<String>) {
    if !path.is_empty() && schema.is_state_only(path) {
        violations.push(format!("State data not allowed: {path}"));
        return;
    }
    if let Value::Object(map) = node {
        for (key, child) in map {
            let child_path = if path.is_empty() { key.clone() } else { format!("{path}/{key}") };
            walk(schema, child, &child_path, violations);
        }
    }
}
