#![no_main]

extern crate proto;

use libfuzzer_sys::fuzz_target;
use proto::{frame::Error, AddressFamily, ObservedAddr};

#[derive(arbitrary::Arbitrary, Debug)]
enum Input {
    /// Encode a frame and check it parses back
    Encode(ObservedAddr),
    /// Parse untrusted bytes
    Parse { ipv6: bool, bytes: Vec<u8> },
}

fuzz_target!(|input: Input| {
    match input {
        Input::Encode(frame) => {
            let buf = frame.to_vec();
            assert_eq!(buf.len(), frame.size());
            // Both frame types encode as 4-byte varints
            let type_len = 4;
            let (parsed, consumed) = ObservedAddr::parse(&buf[type_len..], frame.frame_type())
                .expect("encoded frame must parse");
            assert_eq!(parsed, frame);
            assert_eq!(consumed, buf.len() - type_len);
        }
        Input::Parse { ipv6, bytes } => {
            let family = if ipv6 {
                AddressFamily::V6
            } else {
                AddressFamily::V4
            };
            match ObservedAddr::parse(&bytes, family.frame_type()) {
                Ok((frame, consumed)) => {
                    assert_eq!(frame.family(), family);
                    assert!(consumed <= bytes.len());
                    // Non-minimal varints are accepted, so compare values rather than bytes
                    let reencoded = frame.to_vec();
                    assert_eq!(
                        ObservedAddr::parse(&reencoded[4..], family.frame_type()),
                        Ok((frame, reencoded.len() - 4))
                    );
                }
                Err(Error::UnexpectedEnd { .. } | Error::MalformedVarInt) => {}
                Err(e @ Error::InvalidFrameType(_)) => panic!("{e}"),
            }
        }
    }
});
