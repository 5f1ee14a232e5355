// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The datastore registry (§4.1).

use crate::datastore::Datastore;
use crate::error::StorageError;
use crate::path;
use ncfd_core::datastore::DatastoreName;
use ncfd_core::operation::Operation;
use ncfd_core::session::SessionId;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Names present from process start, before any runtime registration.
const WELL_KNOWN: &[&str] = &[
    DatastoreName::RUNNING,
    DatastoreName::CANDIDATE,
    DatastoreName::STARTUP,
    DatastoreName::FAILSAFE,
];

#[derive(Debug, Clone, Default)]
pub struct DatastoreRegistry {
    stores: HashMap<String, Datastore>,
}

impl DatastoreRegistry {
    /// A fresh registry with `running`, `candidate`, `startup`, `failsafe`
    /// created empty. `rollback` is intentionally absent: it exists only
    /// during a confirmed-commit sequence (§3).
    pub fn bootstrap() -> Self {
        let mut stores = HashMap::new();
        for name in WELL_KNOWN {
            stores.insert((*name).to_string(), Datastore::empty());
        }
        Self { stores }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.stores.contains_key(name)
    }

    /// Runtime-registered names are accepted once `create`d; everything
    /// else must be one of the fixed names.
    pub fn validate_name(&self, name: &str) -> Result<(), StorageError> {
        if self.exists(name) {
            Ok(())
        } else {
            Err(StorageError::UnknownDatabase(name.to_string()))
        }
    }

    pub fn get(
        &self,
        name: &str,
        filter_path: &str,
    ) -> Result<Value, StorageError> {
        let ds = self.require(name)?;
        Ok(path::select(ds.content(), filter_path).cloned().unwrap_or(Value::Null))
    }

    pub fn content(&self, name: &str) -> Result<&Value, StorageError> {
        Ok(self.require(name)?.content())
    }

    pub fn put(&mut self, name: &str, operation: Operation, payload: Value) -> Result<(), StorageError> {
        self.validate_name(name)?;
        let ds = self.require_mut(name)?;
        let mut content = ds.content().clone();
        match operation {
            Operation::Merge => path::merge(&mut content, &payload),
            Operation::Replace => content = payload,
            Operation::Create => {
                if !matches!(content, Value::Null) && content != Value::Object(Default::default())
                {
                    return Err(StorageError::CreateExists);
                }
                content = payload;
            }
            Operation::Delete => {
                if matches!(content, Value::Null) {
                    return Err(StorageError::DeleteAbsent);
                }
                content = Value::Null;
            }
            Operation::Remove => {
                content = Value::Null;
            }
            Operation::None => {
                path::merge(&mut content, &payload);
            }
        }
        ds.set_content(content);
        debug!(db = name, ?operation, "put applied");
        Ok(())
    }

    /// Atomically replace `dst`'s content with `src`'s. On failure `dst` is
    /// left unchanged.
    pub fn copy(&mut self, src: &str, dst: &str) -> Result<(), StorageError> {
        self.validate_name(src)?;
        self.validate_name(dst)?;
        let src_content = self.require(src)?.content().clone();
        let dst_ds = self.require_mut(dst)?;
        dst_ds.set_content(src_content);
        info!(src, dst, "datastore copied");
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<(), StorageError> {
        let ds = self.require_mut(name)?;
        ds.set_content(Value::Object(Default::default()));
        Ok(())
    }

    pub fn create(&mut self, name: &str) -> Result<(), StorageError> {
        if self.exists(name) {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        self.stores.insert(name.to_string(), Datastore::empty());
        Ok(())
    }

    /// Drop `name` from the registry entirely (as opposed to `delete`,
    /// which just clears its content). Used for `rollback`'s lifecycle:
    /// it is created lazily on the first confirmed commit and removed
    /// once the confirmed-commit sequence resolves (§3, §4.4).
    pub fn remove(&mut self, name: &str) -> Result<(), StorageError> {
        self.stores.remove(name).map(|_| ()).ok_or_else(|| StorageError::UnknownDatabase(name.to_string()))
    }

    /// Set aside `name` under `{name}{suffix}` (default `.error`) and
    /// remove the original entry, matching the rollback-failure path
    /// (§4.4 step 4).
    pub fn rename(&mut self, name: &str, new_name: &str) -> Result<(), StorageError> {
        let ds = self.stores.remove(name).ok_or_else(|| StorageError::UnknownDatabase(name.to_string()))?;
        self.stores.insert(new_name.to_string(), ds);
        Ok(())
    }

    pub fn lock(&mut self, name: &str, holder: SessionId) -> Result<(), StorageError> {
        self.validate_name(name)?;
        if name == DatastoreName::CANDIDATE && self.candidate_is_dirty() {
            return Err(StorageError::CandidateDirty);
        }
        let ds = self.require_mut(name)?;
        match ds.lock_holder() {
            Some(holder_id) if holder_id != holder => Err(StorageError::LockDenied(holder_id)),
            Some(_) => Ok(()), // idempotent re-lock by the same holder
            None => {
                ds.lock(holder);
                Ok(())
            }
        }
    }

    pub fn unlock(&mut self, name: &str, holder: SessionId) -> Result<(), StorageError> {
        let ds = self.require_mut(name)?;
        match ds.lock_holder() {
            Some(holder_id) if holder_id == holder => {
                ds.unlock();
                Ok(())
            }
            Some(holder_id) => Err(StorageError::NotHolder { caller: holder, actual_holder: holder_id }),
            None => Err(StorageError::NotHolder { caller: holder, actual_holder: SessionId::from_raw(0) }),
        }
    }

    pub fn islocked(&self, name: &str) -> Option<SessionId> {
        self.stores.get(name).and_then(Datastore::lock_holder)
    }

    /// Release every lock held by `holder`, across all datastores
    /// (session destruction, §3 "Session" lifecycle).
    pub fn unlock_all(&mut self, holder: SessionId) {
        for ds in self.stores.values_mut() {
            if ds.lock_holder() == Some(holder) {
                ds.unlock();
            }
        }
    }

    fn candidate_is_dirty(&self) -> bool {
        match (self.stores.get(DatastoreName::CANDIDATE), self.stores.get(DatastoreName::RUNNING)) {
            (Some(candidate), Some(running)) => candidate.content() != running.content(),
            _ => false,
        }
    }

    fn require(&self, name: &str) -> Result<&Datastore, StorageError> {
        self.stores.get(name).ok_or_else(|| StorageError::UnknownDatabase(name.to_string()))
    }

    fn require_mut(&mut self, name: &str) -> Result<&mut Datastore, StorageError> {
        self.stores.get_mut(name).ok_or_else(|| StorageError::UnknownDatabase(name.to_string()))
    }

    pub(crate) fn stores_for_snapshot(&self) -> HashMap<String, Datastore> {
        self.stores.clone()
    }

    pub(crate) fn from_stores(stores: HashMap<String, Datastore>) -> Self {
        Self { stores }
    }
}
