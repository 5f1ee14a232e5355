// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema definition: {0}")]
    Parse(#[from] hcl::Error),

    #[error("schema node not found: {path}")]
    NodeNotFound { path: String },

    #[error("node at {path} is state-only and cannot be written")]
    StateOnly { path: String },

    #[error("node at {path} does not permit children of this kind")]
    InvalidChild { path: String },
}
