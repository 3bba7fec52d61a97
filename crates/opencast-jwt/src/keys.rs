//! Signing and verification key material
//!
//! Private keys are accepted as PKCS#8 (`PRIVATE KEY`) PEM, SEC1
//! (`EC PRIVATE KEY`) PEM for ES256, or bare base64 PKCS#8 DER. The public
//! half is derived once at load time so the handler can verify the tokens it
//! issues without separate configuration.

use std::fmt;

use jsonwebtoken::{DecodingKey, EncodingKey};
use p256::pkcs8::EncodePrivateKey;
use ring::rand::SystemRandom;
use ring::signature::{
    ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING, EcdsaKeyPair,
    EcdsaSigningAlgorithm, Ed25519KeyPair, KeyPair,
};
use zeroize::Zeroize;

use crate::Result;
use crate::errors::JwtError;
use crate::helpers::{
    PKCS8_LABEL, SEC1_LABEL, base64url_encode, decode_private_key_pem, decode_raw_der,
};
use crate::types::JwtAlgorithm;

/// Private key bound to one signature algorithm
///
/// The PKCS#8 DER bytes are zeroized when the key is dropped.
#[derive(Clone)]
pub struct SigningKey {
    algorithm: JwtAlgorithm,
    pkcs8_der: Vec<u8>,
    encoding_key: EncodingKey,
    verification_key: VerificationKey,
}

impl SigningKey {
    /// Load a key from its textual form (PEM or bare base64 DER)
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationError`] when the text is empty, cannot
    /// be decoded, or does not hold a key for `algorithm`.
    pub fn from_key_string(algorithm: JwtAlgorithm, key: &str) -> Result<Self> {
        let key = key.trim();
        if key.is_empty() {
            return Err(JwtError::config("JWT: Private key is required"));
        }

        if key.starts_with("-----BEGIN") {
            Self::from_pem(algorithm, key)
        } else {
            let mut der = decode_raw_der(key)?;
            let loaded = Self::from_pkcs8_der(algorithm, &der);
            der.zeroize();
            loaded
        }
    }

    /// Load a PEM encoded private key
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationError`] for malformed PEM, input
    /// without a `PRIVATE KEY` / `EC PRIVATE KEY` block, or a key that does
    /// not match `algorithm`.
    pub fn from_pem(algorithm: JwtAlgorithm, pem: &str) -> Result<Self> {
        let mut block = decode_private_key_pem(pem)?;
        let loaded = match block.label.as_str() {
            PKCS8_LABEL => Self::from_pkcs8_der(algorithm, &block.contents),
            SEC1_LABEL => Self::from_sec1_der(algorithm, &block.contents),
            other => Err(JwtError::config(format!(
                "JWT: Unsupported private key PEM label '{other}'"
            ))),
        };
        block.contents.zeroize();
        loaded
    }

    /// Load a SEC1 `ECPrivateKey` structure
    ///
    /// Only P-256 keys are converted; ES384 and EdDSA keys must be PKCS#8.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationError`] when `algorithm` is not ES256
    /// or the structure is not a valid P-256 key.
    pub fn from_sec1_der(algorithm: JwtAlgorithm, der: &[u8]) -> Result<Self> {
        if algorithm != JwtAlgorithm::ES256 {
            return Err(JwtError::config(format!(
                "JWT: SEC1 private keys are only supported for ES256, convert the {algorithm} key to PKCS#8"
            )));
        }

        let secret_key = p256::SecretKey::from_sec1_der(der)
            .map_err(|e| JwtError::config(format!("JWT: Invalid EC private key: {e}")))?;
        let pkcs8_der = secret_key
            .to_pkcs8_der()
            .map_err(|e| JwtError::config(format!("JWT: Failed to convert EC key to PKCS#8: {e}")))?;

        Self::from_pkcs8_der(algorithm, pkcs8_der.as_bytes())
    }

    /// Load a PKCS#8 DER private key
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationError`] when the DER does not hold a
    /// key of the curve required by `algorithm`.
    pub fn from_pkcs8_der(algorithm: JwtAlgorithm, der: &[u8]) -> Result<Self> {
        let (public_key, encoding_key) = match algorithm {
            JwtAlgorithm::ES256 => (
                ecdsa_public_key(&ECDSA_P256_SHA256_FIXED_SIGNING, algorithm, der)?,
                EncodingKey::from_ec_der(der),
            ),
            JwtAlgorithm::ES384 => (
                ecdsa_public_key(&ECDSA_P384_SHA384_FIXED_SIGNING, algorithm, der)?,
                EncodingKey::from_ec_der(der),
            ),
            JwtAlgorithm::EdDSA => {
                let key_pair = Ed25519KeyPair::from_pkcs8_maybe_unchecked(der).map_err(|e| {
                    JwtError::config(format!("JWT: Private key is not a valid EdDSA key: {e}"))
                })?;
                (
                    key_pair.public_key().as_ref().to_vec(),
                    EncodingKey::from_ed_der(der),
                )
            }
        };

        Ok(Self {
            algorithm,
            pkcs8_der: der.to_vec(),
            encoding_key,
            verification_key: VerificationKey::from_public_bytes(algorithm, &public_key)?,
        })
    }

    /// Algorithm this key signs with
    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// Public half of this key
    pub fn verification_key(&self) -> &VerificationKey {
        &self.verification_key
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

fn ecdsa_public_key(
    signing_algorithm: &'static EcdsaSigningAlgorithm,
    algorithm: JwtAlgorithm,
    der: &[u8],
) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(signing_algorithm, der, &rng).map_err(|e| {
        JwtError::config(format!(
            "JWT: Private key is not a valid {algorithm} key: {e}"
        ))
    })?;
    Ok(key_pair.public_key().as_ref().to_vec())
}

impl Zeroize for SigningKey {
    fn zeroize(&mut self) {
        self.pkcs8_der.zeroize();
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("algorithm", &self.algorithm)
            .field("pkcs8_der", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Public key used to check token signatures
#[derive(Clone)]
pub struct VerificationKey {
    algorithm: JwtAlgorithm,
    public_key: Vec<u8>,
    decoding_key: DecodingKey,
}

impl VerificationKey {
    /// Build a verification key from raw public key bytes
    ///
    /// ECDSA keys are uncompressed SEC1 points (`0x04 || x || y`); Ed25519
    /// keys are the 32 raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationError`] when the byte length or point
    /// encoding does not fit `algorithm`.
    pub fn from_public_bytes(algorithm: JwtAlgorithm, public_key: &[u8]) -> Result<Self> {
        let decoding_key = match algorithm {
            JwtAlgorithm::ES256 | JwtAlgorithm::ES384 => {
                let coordinate_len = algorithm.signature_len() / 2;
                if public_key.len() != 1 + 2 * coordinate_len || public_key[0] != 0x04 {
                    return Err(JwtError::config(format!(
                        "JWT: Public key is not an uncompressed {algorithm} point"
                    )));
                }
                let (x, y) = public_key[1..].split_at(coordinate_len);
                DecodingKey::from_ec_components(&base64url_encode(x), &base64url_encode(y))
            }
            JwtAlgorithm::EdDSA => {
                if public_key.len() != 32 {
                    return Err(JwtError::config(format!(
                        "JWT: Ed25519 public key must be 32 bytes, got {}",
                        public_key.len()
                    )));
                }
                DecodingKey::from_ed_components(&base64url_encode(public_key))
            }
        }
        .map_err(|e| JwtError::config(format!("JWT: Invalid public key: {e}")))?;

        Ok(Self {
            algorithm,
            public_key: public_key.to_vec(),
            decoding_key,
        })
    }

    /// Algorithm this key verifies
    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// Raw public key bytes
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl PartialEq for VerificationKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.public_key == other.public_key
    }
}

impl Eq for VerificationKey {}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("algorithm", &self.algorithm)
            .field("public_key", &base64url_encode(&self.public_key))
            .finish_non_exhaustive()
    }
}
