// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tandem::rpc::codec::JsonFrameCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Feed the scanner the same bytes in two patterns: all at once, and one
    // byte at a time. Neither may panic, and a size cap must bound memory.
    let mut codec = JsonFrameCodec::new(1 << 16);
    let mut src = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut src) {}

    let mut codec = JsonFrameCodec::new(1 << 16);
    let mut src = BytesMut::new();
    for b in data {
        src.extend_from_slice(&[*b]);
        loop {
            match codec.decode(&mut src) {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
});
