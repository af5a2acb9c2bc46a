//! Security utilities for session tokens and payment webhook signatures.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default maximum age of a signed webhook, in seconds.
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Hashes a session token using SHA-256.
pub fn hash_session_token(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

/// Generates a new random session token.
pub fn generate_session_token() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    let raw: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect();
    format!("sess_{}", raw)
}

/// Why a `Stripe-Signature` header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("No signatures found matching the expected signature for payload: missing Stripe-Signature header")]
    MissingHeader,

    #[error("Unable to extract timestamp and signatures from header: {0}")]
    MalformedHeader(String),

    #[error("Timestamp outside the tolerance zone ({age}s old, tolerance {tolerance}s)")]
    TimestampOutOfTolerance { age: i64, tolerance: i64 },

    #[error("No signatures found matching the expected signature for payload")]
    Mismatch,
}

/// Computes the hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
pub fn sign_payload(payload: &[u8], timestamp: i64, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Builds a header value in the provider's `t=...,v1=...` format.
pub fn signature_header(payload: &[u8], timestamp: i64, secret: &str) -> String {
    format!("t={},v1={}", timestamp, sign_payload(payload, timestamp, secret))
}

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::MalformedHeader(format!(
                "expected key=value, got {part:?}"
            )));
        };
        match key {
            "t" => {
                let t = value.parse::<i64>().map_err(|_| {
                    SignatureError::MalformedHeader(format!("invalid timestamp {value:?}"))
                })?;
                timestamp = Some(t);
            }
            "v1" => signatures.push(value),
            // v0 and future schemes are ignored
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| SignatureError::MalformedHeader("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader(
            "no v1 signatures".into(),
        ));
    }

    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

/// Verifies a `Stripe-Signature` header against the raw request body.
///
/// Any one matching `v1` signature is accepted (the provider sends several
/// while a secret is being rolled). Comparison is constant-time. A
/// non-positive `tolerance_secs` disables the timestamp check.
pub fn verify_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(SignatureError::MissingHeader)?;
    let parsed = parse_header(header)?;

    let expected = sign_payload(payload, parsed.timestamp, secret);
    let matched = parsed
        .signatures
        .iter()
        .any(|sig| bool::from(expected.as_bytes().ct_eq(sig.as_bytes())));
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let age = now.saturating_sub(parsed.timestamp);
    if tolerance_secs > 0 && age.unsigned_abs() > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::TimestampOutOfTolerance {
            age,
            tolerance: tolerance_secs,
        });
    }

    Ok(())
}
