//! Helper functions shared by the builder, parser and key loading
//!
//! - base64url decoding and private key PEM selection
//! - NumericDate conversion between JSON values and `chrono` instants
//! - mapping between [`JwtAlgorithm`] and `jsonwebtoken::Algorithm`

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::Algorithm;
use serde_json::Value;

use crate::Result;
use crate::errors::JwtError;
use crate::types::JwtAlgorithm;

/// Convert JwtAlgorithm to jsonwebtoken Algorithm
pub fn algorithm_to_jwt(algorithm: JwtAlgorithm) -> Algorithm {
    match algorithm {
        JwtAlgorithm::ES256 => Algorithm::ES256,
        JwtAlgorithm::ES384 => Algorithm::ES384,
        JwtAlgorithm::EdDSA => Algorithm::EdDSA,
    }
}

pub(crate) fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode one base64url segment of a compact token
///
/// Padding is rejected, as is any byte outside the URL-safe alphabet.
pub(crate) fn base64url_decode(segment: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| JwtError::parse(format!("Invalid base64url encoding: {e}")))
}

/// PKCS#8 private key label
pub(crate) const PKCS8_LABEL: &str = "PRIVATE KEY";
/// SEC1 `ECPrivateKey` label
pub(crate) const SEC1_LABEL: &str = "EC PRIVATE KEY";

const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Private key block picked out of a PEM bundle
#[derive(Debug)]
pub(crate) struct PemBlock {
    pub label: String,
    pub contents: Vec<u8>,
}

/// Find the private key block in `input`
///
/// The input may hold several blocks, e.g. the `EC PARAMETERS` block that
/// `openssl ecparam -genkey` writes ahead of the key; the first `PRIVATE KEY`
/// or `EC PRIVATE KEY` block wins. Keys copied from environment variables
/// often carry literal `\n` sequences instead of line breaks; those are
/// normalized first.
pub(crate) fn decode_private_key_pem(input: &str) -> Result<PemBlock> {
    let normalized = input
        .trim()
        .replace("\\n", "\n")
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    let blocks = pem::parse_many(&normalized)
        .map_err(|e| JwtError::config(format!("JWT: Invalid PEM private key: {e}")))?;
    if blocks.is_empty() {
        return Err(JwtError::config("JWT: Private key is not PEM encoded"));
    }

    let encrypted = blocks.iter().any(|block| {
        block.tag() == ENCRYPTED_PKCS8_LABEL || block.headers().get("Proc-Type").is_some()
    });
    if encrypted {
        return Err(JwtError::config(
            "JWT: Encrypted PEM private keys are not supported",
        ));
    }

    let labels: Vec<String> = blocks.iter().map(|block| block.tag().to_string()).collect();
    blocks
        .into_iter()
        .find(|block| matches!(block.tag(), PKCS8_LABEL | SEC1_LABEL))
        .map(|block| PemBlock {
            label: block.tag().to_string(),
            contents: block.into_contents(),
        })
        .ok_or_else(|| {
            JwtError::config(format!(
                "JWT: Unsupported private key PEM label '{}'",
                labels.join("', '")
            ))
        })
}

/// Decode a key given as bare base64 DER (no PEM armour)
pub(crate) fn decode_raw_der(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.split_whitespace().collect();
    STANDARD
        .decode(compact)
        .map_err(|e| {
            JwtError::config(format!(
                "JWT: Private key is neither PEM nor base64 DER: {e}"
            ))
        })
}

/// Encode an instant as a NumericDate (whole seconds since the epoch)
pub(crate) fn numeric_date(instant: DateTime<Utc>) -> Value {
    Value::from(instant.timestamp())
}

/// Read a NumericDate from a decoded claim value
///
/// Integers, fractional seconds (truncated) and numeric strings are accepted.
pub(crate) fn timestamp_from_value(value: &Value) -> Option<DateTime<Utc>> {
    let seconds = match value {
        Value::Number(number) => match number.as_i64() {
            Some(secs) => secs,
            None => float_seconds(number.as_f64()?)?,
        },
        Value::String(text) => {
            let text = text.trim();
            match text.parse::<i64>() {
                Ok(secs) => secs,
                Err(_) => float_seconds(text.parse::<f64>().ok()?)?,
            }
        }
        _ => return None,
    };
    DateTime::from_timestamp(seconds, 0)
}

fn float_seconds(value: f64) -> Option<i64> {
    if value.is_finite() && value.abs() < i64::MAX as f64 {
        Some(value.trunc() as i64)
    } else {
        None
    }
}
