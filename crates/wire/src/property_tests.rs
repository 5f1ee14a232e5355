// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-trip properties for the wire encoding (§8 "Round-trip").

use crate::{decode, encode, Request, Response};
use proptest::prelude::*;

fn arb_operation() -> impl Strategy<Value = ncfd_core::operation::Operation> {
    prop_oneof![
        Just(ncfd_core::operation::Operation::Merge),
        Just(ncfd_core::operation::Operation::Replace),
        Just(ncfd_core::operation::Operation::Create),
        Just(ncfd_core::operation::Operation::Delete),
        Just(ncfd_core::operation::Operation::Remove),
        Just(ncfd_core::operation::Operation::None),
    ]
}

fn arb_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        Just(Request::Ping),
        Just(Request::CloseSession),
        Just(Request::DiscardChanges),
        ("[a-z]{1,12}", proptest::option::of(arb_operation())).prop_map(|(target, op)| {
            Request::EditConfig { target, default_operation: op, config: serde_json::json!({}) }
        }),
        "[a-z]{1,12}".prop_map(|source| Request::GetConfig { source, filter: None }),
        any::<u32>().prop_map(|session_id| Request::KillSession { session_id }),
    ]
}

proptest! {
    #[test]
    fn request_survives_encode_decode(req in arb_request()) {
        let bytes = encode(&req).unwrap();
        let decoded: Request = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, req);
    }

    #[test]
    fn response_ok_and_pong_survive_encode_decode(pick in 0..2u8) {
        let resp = if pick == 0 { Response::Ok } else { Response::Pong };
        let bytes = encode(&resp).unwrap();
        let decoded: Response = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, resp);
    }
}
