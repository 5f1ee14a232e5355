// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ncfd_core::{ErrorKind, ErrorOrigin, RpcError};
use ncfd_plugin::PluginError;
use ncfd_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("validation failed: {0}")]
    Invalid(String),

    #[error("plugin rejected transaction: {0}")]
    PluginRejected(#[from] PluginError),

    #[error("current confirmed-commit is not persistent")]
    NotPersistent,

    #[error("persist-id is required")]
    PersistIdRequired,

    #[error("no confirmed-commit is in progress")]
    NoConfirmedCommitInProgress,
}

impl EngineError {
    /// Maps an internal engine error onto the outward RPC error shape
    /// (§7); this is the only place that does so.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            EngineError::Storage(StorageError::LockDenied(holder)) => {
                RpcError::lock_denied(*holder)
            }
            EngineError::Storage(StorageError::NotHolder { caller, actual_holder }) => {
                RpcError::unlock_denied(*caller, *actual_holder)
            }
            EngineError::Storage(StorageError::UnknownDatabase(name)) => {
                RpcError::unknown_database(name)
            }
            EngineError::Storage(e) => {
                RpcError::new(ErrorOrigin::Datastore, ErrorKind::Application, "operation-failed", e.to_string())
            }
            EngineError::Invalid(msg) => {
                RpcError::new(ErrorOrigin::Schema, ErrorKind::Application, "invalid-value", msg.clone())
            }
            EngineError::PluginRejected(e) => {
                RpcError::new(ErrorOrigin::Plugin, ErrorKind::Application, "operation-failed", e.to_string())
            }
            EngineError::NotPersistent => RpcError::new(
                ErrorOrigin::Rpc,
                ErrorKind::Application,
                "operation-failed",
                "current confirmed-commit is not persistent",
            ),
            EngineError::PersistIdRequired => RpcError::new(
                ErrorOrigin::Rpc,
                ErrorKind::Application,
                "missing-element",
                "persist-id is required",
            ),
            EngineError::NoConfirmedCommitInProgress => RpcError::new(
                ErrorOrigin::Rpc,
                ErrorKind::Application,
                "operation-failed",
                "no confirmed-commit is in progress",
            ),
        }
    }
}
