//! Immutable token builder
//!
//! Every setter borrows the current builder and returns a new one, so a
//! partially configured builder can be reused as a template:
//!
//! ```
//! use opencast_jwt::TokenBuilder;
//!
//! let base = TokenBuilder::new().set_issuer("https://opencast.example.org");
//! let for_admin = base.set_subject("admin");
//! assert!(base.claims().get("sub").is_none());
//! assert_eq!(for_admin.claims()["sub"], "admin");
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::Result;
use crate::TOKEN_TYPE;
use crate::claims::ClaimSet;
use crate::errors::JwtError;
use crate::helpers::{base64url_encode, numeric_date};
use crate::keys::SigningKey;
use crate::signer::Signer;
use crate::token::{DataSet, PlainToken, Signature};
use crate::types::{domain, registered};

/// Accumulates headers and claims and produces a signed [`PlainToken`]
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct TokenBuilder {
    headers: Map<String, Value>,
    claims: Map<String, Value>,
}

impl Default for TokenBuilder {
    fn default() -> Self {
        let mut headers = Map::new();
        headers.insert("typ".to_string(), Value::from(TOKEN_TYPE));
        headers.insert("alg".to_string(), Value::Null);
        Self {
            headers,
            claims: Map::new(),
        }
    }
}

impl TokenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &Map<String, Value> {
        &self.headers
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Add audiences, keeping earlier ones and skipping duplicates
    pub fn set_audience<I, S>(&self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut merged: Vec<Value> = match self.claims.get(registered::AUDIENCE) {
            Some(Value::Array(existing)) => existing.clone(),
            _ => Vec::new(),
        };
        for audience in audiences {
            let audience = Value::String(audience.into());
            if !merged.contains(&audience) {
                merged.push(audience);
            }
        }
        self.with_claim(registered::AUDIENCE, Value::Array(merged))
    }

    pub fn set_expiration(&self, instant: DateTime<Utc>) -> Self {
        self.with_claim(registered::EXPIRATION_TIME, numeric_date(instant))
    }

    pub fn set_issued_at(&self, instant: DateTime<Utc>) -> Self {
        self.with_claim(registered::ISSUED_AT, numeric_date(instant))
    }

    pub fn set_not_before(&self, instant: DateTime<Utc>) -> Self {
        self.with_claim(registered::NOT_BEFORE, numeric_date(instant))
    }

    pub fn set_issuer(&self, issuer: impl Into<String>) -> Self {
        self.with_claim(registered::ISSUER, Value::String(issuer.into()))
    }

    pub fn set_id(&self, id: impl Into<String>) -> Self {
        self.with_claim(registered::ID, Value::String(id.into()))
    }

    pub fn set_subject(&self, subject: impl Into<String>) -> Self {
        self.with_claim(registered::SUBJECT, Value::String(subject.into()))
    }

    /// Set a header value
    ///
    /// `alg` may be set but is always replaced by the signer's id in
    /// [`TokenBuilder::build`].
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.headers.insert(name.into(), value.into());
        next
    }

    /// Set a private claim
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ReservedClaimName`] for registered claim names and
    /// [`JwtError::EncodingError`] when `value` cannot be represented as JSON.
    pub fn set_custom_claim<T>(&self, name: &str, value: T) -> Result<Self>
    where
        T: Serialize,
    {
        if registered::is_registered(name) {
            return Err(JwtError::ReservedClaimName {
                name: name.to_string(),
            });
        }
        let value = serde_json::to_value(value)?;
        Ok(self.with_claim(name, value))
    }

    /// Merge the wire claims of an Opencast claim set
    ///
    /// # Errors
    ///
    /// Returns the claim set's schema error, or
    /// [`JwtError::InvalidDomainClaim`] for a produced name outside the
    /// Opencast allow-list.
    pub fn absorb_domain_claims(&self, claim_set: &ClaimSet) -> Result<Self> {
        let wire = claim_set.to_wire_map()?;
        let mut next = self.clone();
        for (name, value) in wire {
            if !domain::is_domain_claim(&name) {
                return Err(JwtError::InvalidDomainClaim { name });
            }
            next.claims.insert(name, value);
        }
        Ok(next)
    }

    /// Encode and sign the token
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::EncodingError`] if a header or claim cannot be
    /// serialized and [`JwtError::CryptographicError`] if signing fails.
    pub fn build(&self, signer: &dyn Signer, key: &SigningKey) -> Result<PlainToken> {
        let mut headers = self.headers.clone();
        headers.insert("alg".to_string(), Value::from(signer.algorithm_id()));

        let encoded_header = base64url_encode(serde_json::to_vec(&headers)?);
        let encoded_claims = base64url_encode(serde_json::to_vec(&wire_claims(&self.claims))?);

        let signing_input = format!("{encoded_header}.{encoded_claims}");
        let signature = signer.sign(signing_input.as_bytes(), key)?;
        let encoded_signature = base64url_encode(&signature);

        debug!(
            algorithm = signer.algorithm_id(),
            claims = self.claims.len(),
            "Signed token"
        );

        Ok(PlainToken::new(
            DataSet::new(headers, encoded_header),
            DataSet::new(self.claims.clone(), encoded_claims),
            Signature::new(signature, encoded_signature),
        ))
    }

    fn with_claim(&self, name: &str, value: Value) -> Self {
        let mut next = self.clone();
        next.claims.insert(name.to_string(), value);
        next
    }
}

/// Claims as they go on the wire: a single audience is written as a string
fn wire_claims(claims: &Map<String, Value>) -> Map<String, Value> {
    let mut formatted = claims.clone();
    let single = match formatted.get(registered::AUDIENCE) {
        Some(Value::Array(audiences)) if audiences.len() == 1 => Some(audiences[0].clone()),
        _ => None,
    };
    if let Some(audience) = single {
        formatted.insert(registered::AUDIENCE.to_string(), audience);
    }
    formatted
}
