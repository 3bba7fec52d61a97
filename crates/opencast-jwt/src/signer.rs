//! Signature back-end used by the builder and the signature constraint

use jsonwebtoken::crypto;
use tracing::debug;

use crate::Result;
use crate::errors::JwtError;
use crate::helpers::{algorithm_to_jwt, base64url_decode, base64url_encode};
use crate::keys::{SigningKey, VerificationKey};
use crate::types::JwtAlgorithm;

/// Produces and checks raw token signatures
///
/// The builder writes [`Signer::algorithm_id`] into the `alg` header, so the
/// signer is the single source of truth for the algorithm a token claims.
pub trait Signer: Send + Sync {
    /// Value written to the `alg` header
    fn algorithm_id(&self) -> &'static str;

    /// Sign `payload` (the `header.claims` text) and return raw signature bytes
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::CryptographicError`] when the key does not belong to
    /// this signer or the back-end fails.
    fn sign(&self, payload: &[u8], key: &SigningKey) -> Result<Vec<u8>>;

    /// Check raw signature bytes against `payload`
    ///
    /// A signature that simply does not match yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::CryptographicError`] when the key does not belong to
    /// this signer.
    fn verify(&self, signature: &[u8], payload: &[u8], key: &VerificationKey) -> Result<bool>;
}

impl Signer for JwtAlgorithm {
    fn algorithm_id(&self) -> &'static str {
        self.as_str()
    }

    fn sign(&self, payload: &[u8], key: &SigningKey) -> Result<Vec<u8>> {
        if key.algorithm() != *self {
            return Err(JwtError::crypto(format!(
                "{} key cannot sign {self} tokens",
                key.algorithm()
            )));
        }

        let encoded = crypto::sign(payload, key.encoding_key(), algorithm_to_jwt(*self))
            .map_err(|e| JwtError::crypto(format!("Failed to sign token: {e}")))?;
        base64url_decode(&encoded)
            .map_err(|e| JwtError::crypto(format!("Signer produced invalid output: {e}")))
    }

    fn verify(&self, signature: &[u8], payload: &[u8], key: &VerificationKey) -> Result<bool> {
        if key.algorithm() != *self {
            return Err(JwtError::crypto(format!(
                "{} key cannot verify {self} tokens",
                key.algorithm()
            )));
        }

        if signature.len() != self.signature_len() {
            debug!(
                algorithm = %self,
                expected = self.signature_len(),
                actual = signature.len(),
                "Signature has wrong length"
            );
            return Ok(false);
        }

        match crypto::verify(
            &base64url_encode(signature),
            payload,
            key.decoding_key(),
            algorithm_to_jwt(*self),
        ) {
            Ok(valid) => Ok(valid),
            Err(e) => {
                debug!(algorithm = %self, error = %e, "Signature verification failed");
                Ok(false)
            }
        }
    }
}
