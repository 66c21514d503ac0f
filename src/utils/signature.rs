use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the expected signature for a webhook payload: HMAC-SHA256 over
/// the UTF-8 JSON serialization, hex-encoded, prefixed with `sha256=`.
///
/// Returns `None` if the payload cannot be serialized. The crate's
/// `serde_json` has `preserve_order` enabled, so a payload parsed from a
/// request body re-serializes with its keys in received order.
pub fn sign(payload: &Value, secret: &str) -> Option<String> {
    let bytes = serde_json::to_vec(payload).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(&bytes);
    let digest = mac.finalize().into_bytes();
    Some(format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest)))
}

/// Verifies a supplied signature against the payload. Never panics and
/// never errors: any malformed input yields `false`.
pub fn verify(payload: &Value, signature: &str, secret: &str) -> bool {
    let expected = match sign(payload, secret) {
        Some(s) => s,
        None => return false,
    };
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

/// Constant-time byte comparison. Length is checked up front; the XOR fold
/// only runs on equal-length inputs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}
