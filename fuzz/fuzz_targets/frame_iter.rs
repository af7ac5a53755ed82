#![no_main]

extern crate proto;

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use proto::{frame::Iter, TransportError};

fuzz_target!(|data: Vec<u8>| {
    let Ok(iter) = Iter::new(Bytes::from(data)) else {
        return;
    };
    for frame in iter {
        if let Err(e) = frame {
            // Every failure must be expressible as a connection error
            let _ = TransportError::from(e);
        }
    }
});
