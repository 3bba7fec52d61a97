//! Error types for token issuance and parsing
//!
//! Semantic validation failures are not errors: they are reported as
//! [`ConstraintViolation`](crate::validation::ConstraintViolation) values and
//! mapped to `false` by [`TokenHandler::validate_token`](crate::TokenHandler::validate_token).

use thiserror::Error;

/// Errors raised by the token subsystem
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// Handler or key configuration is unusable
    #[error("JWT configuration error: {reason}")]
    ConfigurationError {
        /// What is wrong with the configuration
        reason: String,
    },

    /// Claim set does not satisfy the Opencast claim schema
    #[error("JWT claim schema error: {reason}")]
    SchemaError {
        /// Which schema rule was broken
        reason: String,
    },

    /// A registered claim was passed to the generic custom-claim setter
    #[error("Claim \"{name}\" is a registered claim and must be set through its dedicated method")]
    ReservedClaimName {
        /// The offending claim name
        name: String,
    },

    /// A claim outside the Opencast allow-list was absorbed from a claim set
    #[error("Claim \"{name}\" is not a valid Opencast claim")]
    InvalidDomainClaim {
        /// The offending claim name
        name: String,
    },

    /// A header or claim value could not be encoded
    #[error("JWT encoding error: {reason}")]
    EncodingError {
        /// Underlying serializer message
        reason: String,
    },

    /// The compact token string is structurally invalid
    #[error("JWT: Unable to parse token: {reason}")]
    ParseError {
        /// Why decoding failed
        reason: String,
    },

    /// Signing or key handling failed
    #[error("JWT cryptographic error: {reason}")]
    CryptographicError {
        /// Backend failure description
        reason: String,
    },
}

impl JwtError {
    /// Stable label for logs
    pub fn category(&self) -> &'static str {
        match self {
            JwtError::ConfigurationError { .. } => "configuration",
            JwtError::SchemaError { .. } => "schema",
            JwtError::ReservedClaimName { .. } => "reserved_claim_name",
            JwtError::InvalidDomainClaim { .. } => "invalid_domain_claim",
            JwtError::EncodingError { .. } => "encoding",
            JwtError::ParseError { .. } => "parse",
            JwtError::CryptographicError { .. } => "cryptographic",
        }
    }

    /// Whether the caller can fix the input and retry with the same handler
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, JwtError::ConfigurationError { .. })
    }

    pub(crate) fn schema(reason: impl Into<String>) -> Self {
        JwtError::SchemaError {
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        JwtError::ParseError {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        JwtError::ConfigurationError {
            reason: reason.into(),
        }
    }

    pub(crate) fn crypto(reason: impl Into<String>) -> Self {
        JwtError::CryptographicError {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for JwtError {
    fn from(error: serde_json::Error) -> Self {
        JwtError::EncodingError {
            reason: error.to_string(),
        }
    }
}
