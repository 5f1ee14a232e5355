// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers exposed to downstream crates behind `test-support`.

use crate::session::SessionId;
use std::sync::atomic::AtomicU32;

/// A private counter per call, handy for tests that just need *a* session id
/// without caring about global uniqueness across the whole test binary.
pub fn fresh_session_id() -> SessionId {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    SessionId::next(&COUNTER)
}
