// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ncfd-wire: the request/reply message shapes and the length-prefixed
//! framing used to carry them between a front-end and `ncfd-daemon`
//! (§6 "Internal request/reply framing").

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{ConfirmedCommitOutcome, Response, RollbackReport};
pub use wire::{
    decode, encode, read_message, read_request, write_message, write_response, ProtocolError,
    DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

#[cfg(test)]
mod property_tests;
