// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use tandem::{RequestId, WireMessage, WireObject, WireRequest, WireResponse};

fuzz_target!(|data: &[u8]| {
    // The wire deserializers must reject, never crash. Ids deserve special
    // attention because absent, null, string, and number all mean
    // different things.
    let _ = serde_json::from_slice::<RequestId>(data);
    let _ = serde_json::from_slice::<WireRequest>(data);
    let _ = serde_json::from_slice::<WireResponse>(data);
    let _ = serde_json::from_slice::<WireObject>(data);

    // Anything that parses as a message must survive a marshal round trip.
    if let Ok(msg) = serde_json::from_slice::<WireMessage>(data) {
        let bytes = serde_json::to_vec(&msg).expect("parsed message must marshal");
        let back: WireMessage =
            serde_json::from_slice(&bytes).expect("marshaled message must parse");
        assert_eq!(back, msg);
    }
});
