// SPDX-FileCopyrightText: 2026 Aurum Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification.
//!
//! The provider signs the raw request body with HMAC-SHA256 over the shared
//! app secret and sends `sha256=<hex>` in the `X-Hub-Signature-256` header.
//! Verification happens before any payload parsing or state mutation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Verify the signature header against the raw request body.
///
/// With no app secret configured, verification is skipped with a warning
/// (development mode only). The digest comparison is constant-time via
/// `Mac::verify_slice`.
pub fn verify_signature(app_secret: Option<&str>, header: Option<&str>, body: &[u8]) -> bool {
    let Some(secret) = app_secret else {
        warn!("no app secret configured, skipping webhook signature verification");
        return true;
    };
    let Some(header) = header else {
        return false;
    };
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature header value for a body. Used by tests and by any
/// internal caller that needs to replay a stored payload.
pub fn sign(app_secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(app_secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
