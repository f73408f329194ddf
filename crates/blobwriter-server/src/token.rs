//! Per-start auth token for the local endpoint.

use rand::Rng;
use subtle::ConstantTimeEq;

/// Token length in random bytes (hex-encoded to twice as many characters).
const TOKEN_BYTES: usize = 32;

pub fn generate_auth_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time token comparison.
pub fn tokens_match(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}
