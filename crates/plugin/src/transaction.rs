// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transaction object built at commit's "transaction begin" phase
//! (§4.3 step 2).

use serde_json::Value;
use std::collections::BTreeSet;

/// `source = running`, `target = candidate_src`, plus the diff of node
/// keys between them. The diff is computed over top-level keys of the
/// config tree; nested diffing is a plugin's own concern if it cares.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub source: Value,
    pub target: Value,
    pub added: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub changed: BTreeSet<String>,
}

impl TransactionContext {
    pub fn new(source: Value, target: Value) -> Self {
        let source_keys = keys_of(&source);
        let target_keys = keys_of(&target);

        let added = target_keys.difference(&source_keys).cloned().collect();
        let deleted = source_keys.difference(&target_keys).cloned().collect();
        let changed = source_keys
            .intersection(&target_keys)
            .filter(|k| source.get(k.as_str()) != target.get(k.as_str()))
            .cloned()
            .collect();

        Self { source, target, added, deleted, changed }
    }

    pub fn is_empty_diff(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty()
    }
}

fn keys_of(value: &Value) -> BTreeSet<String> {
    value.as_object().map(|m| m.keys().cloned().collect()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn diff_classifies_added_deleted_changed() {
        let ctx = TransactionContext::new(
            json!({"a": 1, "b": 2, "c": 3}),
            json!({"a": 1, "b": 20, "d": 4}),
        );
        assert_eq!(ctx.added, BTreeSet::from(["d".to_string()]));
        assert_eq!(ctx.deleted, BTreeSet::from(["c".to_string()]));
        assert_eq!(ctx.changed, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn identical_trees_have_empty_diff() {
        let ctx = TransactionContext::new(json!({"a": 1}), json!({"a": 1}));
        assert!(ctx.is_empty_diff());
    }
}
