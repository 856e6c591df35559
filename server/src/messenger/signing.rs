//! HMAC-SHA256 Webhook Signatures
//!
//! Verifies that a webhook payload was produced by the channel holding the
//! shared app secret. The header has the form `sha256=<hex digest>` and the
//! digest covers the exact raw request bytes.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Signature verification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature header")]
    MissingSignature,
    #[error("Malformed signature header")]
    MalformedSignature,
    #[error("Signature does not match payload")]
    SignatureMismatch,
}

fn mac_for(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Sign a payload with HMAC-SHA256 and return the hex-encoded digest.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Full header value (`sha256=<hex>`) for a payload.
pub fn signature_header(secret: &str, payload: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", sign_payload(secret, payload))
}

/// Verify a `sha256=<hex>` signature header against the raw payload.
///
/// The digest comparison is constant-time.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str) -> Result<(), SignatureError> {
    if header.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let encoded = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::MalformedSignature)?;
    let signature = hex::decode(encoded).map_err(|_| SignatureError::MalformedSignature)?;

    let mut mac = mac_for(secret);
    mac.update(payload);
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::SignatureMismatch)
}
