// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Datastore name vocabulary (§6 "Datastore name vocabulary").

use std::fmt;

/// Name of a configuration datastore.
///
/// The well-known names are fixed; anything else is a runtime-registered
/// name that the registry validates against its own table
/// (`validate_name`, §4.1) rather than against this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DatastoreName(String);

impl DatastoreName {
    pub const RUNNING: &'static str = "running";
    pub const CANDIDATE: &'static str = "candidate";
    pub const STARTUP: &'static str = "startup";
    pub const ROLLBACK: &'static str = "rollback";
    pub const FAILSAFE: &'static str = "failsafe";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn running() -> Self {
        Self::new(Self::RUNNING)
    }

    pub fn candidate() -> Self {
        Self::new(Self::CANDIDATE)
    }

    pub fn startup() -> Self {
        Self::new(Self::STARTUP)
    }

    pub fn rollback() -> Self {
        Self::new(Self::ROLLBACK)
    }

    pub fn failsafe() -> Self {
        Self::new(Self::FAILSAFE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Any of the five names the core itself reasons about, as opposed to a
    /// runtime-registered name that only the registry knows about.
    pub fn is_well_known(&self) -> bool {
        matches!(
            self.0.as_str(),
            Self::RUNNING | Self::CANDIDATE | Self::STARTUP | Self::ROLLBACK | Self::FAILSAFE
        )
    }
}

impl fmt::Display for DatastoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DatastoreName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DatastoreName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl std::borrow::Borrow<str> for DatastoreName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
