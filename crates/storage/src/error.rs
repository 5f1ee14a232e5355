// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ncfd_core::session::SessionId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("unknown database: {0}")]
    UnknownDatabase(String),

    #[error("database already exists: {0}")]
    AlreadyExists(String),

    #[error("lock is already held by session {0}")]
    LockDenied(SessionId),

    #[error("candidate has uncommitted changes relative to running")]
    CandidateDirty,

    #[error("session {caller} is not the lock holder (held by {actual_holder})")]
    NotHolder { caller: SessionId, actual_holder: SessionId },

    #[error("target node already exists")]
    CreateExists,

    #[error("target node is absent")]
    DeleteAbsent,

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("snapshot io error: {0}")]
    SnapshotIo(String),
}
