//! Webhook signature verification.
//!
//! Vercel signs every webhook delivery with HMAC-SHA1 over the raw request
//! body, keyed by the integration's client secret, and sends the lowercase
//! hex digest in the `x-vercel-signature` header.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_HEADER: &str = "x-vercel-signature";

/// Computes the hex-encoded HMAC-SHA1 of `payload`, as Vercel sends it.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a webhook signature against the raw body and shared secret.
///
/// `payload` must be the bytes exactly as received; re-serializing parsed
/// JSON changes whitespace and key order and breaks the digest.
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        warn!("Refusing to verify webhook signature with an empty secret");
        return false;
    }

    let signature_bytes = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    // Only the canonical lowercase form matches the sender's digest.
    if hex::encode(&signature_bytes) != signature {
        return false;
    }

    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&signature_bytes).is_ok()
}
