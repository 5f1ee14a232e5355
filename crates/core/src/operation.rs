// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The edit operation enum applied by `put` (§4.1).

use serde::{Deserialize, Serialize};

/// How a `put` mutates the target subtree relative to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Recursively combine payload into target.
    Merge,
    /// Substitute target with payload.
    Replace,
    /// Fails if the target node already exists.
    Create,
    /// Fails if the target node is absent.
    Delete,
    /// Idempotent delete: absent target is not an error.
    Remove,
    /// No default operation; every child must carry its own per-node
    /// operation tag.
    None,
}

impl Operation {
    /// The operation implied when a request omits `default-operation`
    /// (§4.2 `edit-config`).
    pub fn default_for_edit_config() -> Self {
        Operation::Merge
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::default_for_edit_config()
    }
}
