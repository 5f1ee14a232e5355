// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ncfd-storage: the datastore registry (§2 "Datastore registry", §4.1).
//!
//! On-disk encoding of a datastore is a named Non-goal; this crate treats
//! datastore content as an opaque, serializable tree (`serde_json::Value`)
//! addressed by datastore name, and implements the operations and locking
//! discipline the rest of the system depends on.

mod datastore;
mod error;
mod path;
mod registry;
mod snapshot;

pub use datastore::Datastore;
pub use error::StorageError;
pub use path::select;
pub use registry::DatastoreRegistry;
