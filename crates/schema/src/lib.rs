// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ncfd-schema: the read-only schema tree used to validate structural
//! changes and to distinguish configuration from state data (§2 "Schema
//! registry", §4.2 `edit-config` steps 2-4).
//!
//! The schema language and its parser are a named external collaborator
//! (spec Non-goals); this crate defines the contract a loaded schema must
//! satisfy and a minimal HCL-backed loader that satisfies it, the way
//! `ncfd-engine`'s teacher loads its own declarative definitions with
//! `hcl-rs`.

mod error;
mod node;
mod registry;

pub use error::SchemaError;
pub use node::{NodeKind, SchemaNode};
pub use registry::SchemaRegistry;
