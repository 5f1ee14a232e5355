// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single named datastore (§3 "Datastore").

use ncfd_core::session::SessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, mutable, schema-validated tree, plus its modification counter
/// and advisory lock holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Datastore {
    content: Value,
    modification_count: u64,
    lock_holder: Option<SessionId>,
}

impl Datastore {
    pub fn empty() -> Self {
        Self { content: Value::Object(serde_json::Map::new()), modification_count: 0, lock_holder: None }
    }

    pub fn with_content(content: Value) -> Self {
        Self { content, modification_count: 0, lock_holder: None }
    }

    pub fn content(&self) -> &Value {
        &self.content
    }

    pub fn modification_count(&self) -> u64 {
        self.modification_count
    }

    pub fn lock_holder(&self) -> Option<SessionId> {
        self.lock_holder
    }

    pub(crate) fn set_content(&mut self, content: Value) {
        self.content = content;
        self.modification_count += 1;
    }

    pub(crate) fn lock(&mut self, holder: SessionId) {
        self.lock_holder = Some(holder);
    }

    pub(crate) fn unlock(&mut self) {
        self.lock_holder = None;
    }
}

impl Default for Datastore {
    fn default() -> Self {
        Self::empty()
    }
}
