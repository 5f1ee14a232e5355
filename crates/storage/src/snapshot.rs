// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional on-disk snapshotting of the registry, for crash recovery
//! (§4.4 "Crash recovery"). The encoding itself is opaque per spec Non-goals
//! — this just needs *a* format, so it reuses `serde_json` the way the
//! rest of the wire and storage layer already does.

use crate::datastore::Datastore;
use crate::error::StorageError;
use crate::registry::DatastoreRegistry;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SnapshotFile {
    stores: HashMap<String, Datastore>,
}

impl DatastoreRegistry {
    pub fn snapshot_to(&self, path: &Path) -> Result<(), StorageError> {
        let file = SnapshotFile { stores: self.stores_for_snapshot() };
        let bytes = serde_json::to_vec_pretty(&file).map_err(|e| StorageError::SnapshotIo(e.to_string()))?;
        std::fs::write(path, bytes).map_err(|e| StorageError::SnapshotIo(e.to_string()))?;
        Ok(())
    }

    pub fn load_snapshot(path: &Path) -> Result<Self, StorageError> {
        let bytes = std::fs::read(path).map_err(|e| StorageError::SnapshotIo(e.to_string()))?;
        let file: SnapshotFile =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::SnapshotIo(e.to_string()))?;
        Ok(Self::from_stores(file.stores))
    }
}
