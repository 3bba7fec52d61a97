//! Semantic checks on parsed tokens
//!
//! Constraints return a [`ConstraintViolation`] instead of an error: a token
//! that decodes but is expired, unsigned or missing Opencast claims is a
//! normal outcome that [`TokenHandler::validate_token`](crate::TokenHandler::validate_token)
//! reports as `false`.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::claims::ClaimSet;
use crate::clock::{Clock, SystemClock};
use crate::keys::VerificationKey;
use crate::signer::Signer;
use crate::token::{PlainToken, Token};
use crate::types::JwtAlgorithm;

/// Why a structurally valid token was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    #[error("You should pass a plain token")]
    NotPlain,

    #[error("\"Expiration Time\" claim missing")]
    MissingExpiry,

    #[error("The token is expired")]
    Expired,

    #[error("Invalid Opencast token claims!")]
    InvalidDomainClaims,

    #[error("Token signer mismatch: expected {expected}, found {found}")]
    AlgorithmMismatch {
        expected: String,
        found: String,
    },

    #[error("Token signature mismatch")]
    InvalidSignature,
}

/// A single check applied to a parsed token
pub trait Constraint: Send + Sync {
    /// Pass, or report the first rule the token breaks
    fn assert(&self, token: &Token) -> Result<(), ConstraintViolation>;
}

/// Run `constraints` in order, stopping at the first violation
pub fn validate(token: &Token, constraints: &[&dyn Constraint]) -> Result<(), ConstraintViolation> {
    constraints
        .iter()
        .try_for_each(|constraint| constraint.assert(token))
}

fn plain(token: &Token) -> Result<&PlainToken, ConstraintViolation> {
    token.as_plain().ok_or(ConstraintViolation::NotPlain)
}

/// Checks that a token is fresh and carries a usable Opencast claim set
///
/// Rules, in order: the token is plain, `exp` is present, `now < exp`, and
/// the claims rebuild into a [`ClaimSet`]. `nbf` is not checked.
#[derive(Debug, Clone)]
pub struct DomainClaimsConstraint {
    clock: Arc<dyn Clock>,
}

impl DomainClaimsConstraint {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Default for DomainClaimsConstraint {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Constraint for DomainClaimsConstraint {
    fn assert(&self, token: &Token) -> Result<(), ConstraintViolation> {
        let token = plain(token)?;

        let expiry = token.expiry().ok_or(ConstraintViolation::MissingExpiry)?;
        let now = self.clock.now();
        if now >= expiry {
            debug!(expired_at = %expiry, now = %now, "Token expired");
            return Err(ConstraintViolation::Expired);
        }

        ClaimSet::from_parsed_claims(token.claims().all())
            .map(|_| ())
            .map_err(|e| {
                debug!(error = %e, "Token claims do not form an Opencast claim set");
                ConstraintViolation::InvalidDomainClaims
            })
    }
}

/// Checks the `alg` header and the signature against a verification key
#[derive(Debug, Clone)]
pub struct SignedWith {
    algorithm: JwtAlgorithm,
    key: VerificationKey,
}

impl SignedWith {
    pub fn new(algorithm: JwtAlgorithm, key: VerificationKey) -> Self {
        Self { algorithm, key }
    }

    pub fn key(&self) -> &VerificationKey {
        &self.key
    }
}

impl Constraint for SignedWith {
    fn assert(&self, token: &Token) -> Result<(), ConstraintViolation> {
        let token = plain(token)?;

        let found = token.algorithm().unwrap_or_default();
        if found != self.algorithm.algorithm_id() {
            return Err(ConstraintViolation::AlgorithmMismatch {
                expected: self.algorithm.algorithm_id().to_string(),
                found: found.to_string(),
            });
        }

        let signing_input = token.signing_input();
        match self.algorithm.verify(
            token.signature().bytes(),
            signing_input.as_bytes(),
            &self.key,
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(ConstraintViolation::InvalidSignature),
            Err(e) => {
                debug!(error = %e, "Signature could not be checked");
                Err(ConstraintViolation::InvalidSignature)
            }
        }
    }
}
