#![no_main]

use common::jwt::verify_identity_token;
use libfuzzer_sys::fuzz_target;

const KEY: &[u8] = b"fuzz-signing-key-0123456789abcdef";

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a bearer token: must be rejected or accepted, never panic
    if let Ok(token) = std::str::from_utf8(data) {
        let _ = verify_identity_token(token, KEY, "access-control", "access-control-clients", 0);
        let _ = verify_identity_token(token, &[], "access-control", "access-control-clients", 0);
    }
});
