//! WebSocket opening-handshake key derivation (RFC 6455 §4.2.2).

use base64::prelude::*;
use sha1::{Digest, Sha1};

/// The handshake GUID appended to the client key before hashing.
const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// A fresh `Sec-WebSocket-Key` value: 16 random bytes, base64-encoded.
pub fn generate_key() -> String {
    let nonce: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(nonce)
}

/// Derive the `Sec-WebSocket-Accept` value for a client key.
pub fn accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.trim().as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64_STANDARD.encode(hasher.finalize())
}

/// Recompute the accept value for `client_key` and compare.
pub fn validate_accept(client_key: &str, accept: &str) -> bool {
    accept_key(client_key) == accept.trim()
}
