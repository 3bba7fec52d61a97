//! Token handler: the entry point used by the REST client

use std::sync::Arc;

use chrono::Duration;
use secrecy::ExposeSecret;
use tracing::{debug, error, warn};

use crate::builder::TokenBuilder;
use crate::claims::ClaimSet;
use crate::clock::{Clock, SystemClock};
use crate::config::JwtConfig;
use crate::errors::JwtError;
use crate::keys::{SigningKey, VerificationKey};
use crate::parser::TokenParser;
use crate::token::{PlainToken, Token};
use crate::types::JwtAlgorithm;
use crate::validation::{DomainClaimsConstraint, SignedWith, validate};
use crate::{DEFAULT_EXPIRY_SECONDS, Result};

/// Issues and validates Opencast JWTs with one fixed key
///
/// The handler holds only immutable key material and is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct TokenHandler {
    algorithm: JwtAlgorithm,
    signing_key: SigningKey,
    default_expiry: Duration,
    clock: Arc<dyn Clock>,
    parser: TokenParser,
    signed_with: SignedWith,
    domain_claims: DomainClaimsConstraint,
}

impl TokenHandler {
    /// Create a handler
    ///
    /// `algorithm` defaults to ES256; `expiration` (seconds) defaults to 15
    /// when absent or not positive.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ConfigurationError`] when the algorithm is not
    /// supported, the key is empty, or the key cannot be loaded for the
    /// algorithm.
    pub fn new(private_key: &str, algorithm: Option<&str>, expiration: Option<i64>) -> Result<Self> {
        let algorithm = match algorithm {
            Some(id) => id.parse::<JwtAlgorithm>().inspect_err(|e| {
                error!(algorithm = id, error = %e, "Rejected JWT handler configuration");
            })?,
            None => JwtAlgorithm::default(),
        };

        if private_key.trim().is_empty() {
            error!("JWT handler configured without a private key");
            return Err(JwtError::config("JWT: Private key is required"));
        }

        let signing_key = SigningKey::from_key_string(algorithm, private_key)?;

        let seconds = match expiration {
            Some(seconds) if seconds > 0 => seconds,
            Some(seconds) => {
                warn!(
                    configured = seconds,
                    default = DEFAULT_EXPIRY_SECONDS,
                    "Non-positive JWT expiration, using default"
                );
                DEFAULT_EXPIRY_SECONDS
            }
            None => DEFAULT_EXPIRY_SECONDS,
        };

        let default_expiry = Duration::try_seconds(seconds).ok_or_else(|| {
            JwtError::config(format!("JWT: Expiration of {seconds} seconds is out of range"))
        })?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let signed_with = SignedWith::new(algorithm, signing_key.verification_key().clone());

        debug!(algorithm = %algorithm, expiry_seconds = seconds, "JWT handler ready");

        Ok(Self {
            algorithm,
            signing_key,
            default_expiry,
            domain_claims: DomainClaimsConstraint::new(Arc::clone(&clock)),
            clock,
            parser: TokenParser::new(),
            signed_with,
        })
    }

    /// Create a handler from the `jwt` configuration section
    ///
    /// # Errors
    ///
    /// Same as [`TokenHandler::new`].
    pub fn from_config(config: &JwtConfig) -> Result<Self> {
        Self::new(
            config.private_key.expose_secret(),
            config.algorithm.as_deref(),
            config.expiration,
        )
    }

    /// Replace the time source used for default expiry and freshness checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.domain_claims = DomainClaimsConstraint::new(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// Algorithm ids this handler can be configured with
    pub fn supported_algorithms() -> Vec<&'static str> {
        JwtAlgorithm::supported_ids()
    }

    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// Lifetime given to tokens whose claim set has no expiry
    pub fn default_expiry(&self) -> Duration {
        self.default_expiry
    }

    /// Public key matching the configured private key
    pub fn verification_key(&self) -> &VerificationKey {
        self.signed_with.key()
    }

    /// Issue a token and return its compact form
    ///
    /// `claims` is not modified; when it has no expiry the token expires
    /// `default_expiry` after now.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::SchemaError`] when the claim set has neither roles
    /// nor ACLs, [`JwtError::ConfigurationError`] when the default expiry
    /// cannot be added to the current time, and encoding or signing errors
    /// from the builder.
    pub fn issue_token(&self, claims: &ClaimSet) -> Result<String> {
        self.issue(claims).map(|token| token.to_string())
    }

    /// Issue a token and return all of its parts
    ///
    /// # Errors
    ///
    /// Same as [`TokenHandler::issue_token`].
    pub fn issue(&self, claims: &ClaimSet) -> Result<PlainToken> {
        let mut claims = claims.clone();
        if !claims.has_expiry() {
            let expiry = self
                .clock
                .now()
                .checked_add_signed(self.default_expiry)
                .ok_or_else(|| {
                    JwtError::config(format!(
                        "JWT: Expiration of {} seconds runs past the latest representable instant",
                        self.default_expiry.num_seconds()
                    ))
                })?;
            claims.set_expiry(expiry);
        }

        TokenBuilder::new()
            .absorb_domain_claims(&claims)?
            .build(&self.algorithm, &self.signing_key)
            .inspect_err(|e| {
                warn!(algorithm = %self.algorithm, error = %e, "Failed to issue token");
            })
    }

    /// Check a token
    ///
    /// Returns `Ok(false)` for tokens that decode but are expired, signed by
    /// another key or algorithm, or lack the Opencast claims.
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ParseError`] when `token` cannot be decoded.
    pub fn validate_token(&self, token: &str) -> Result<bool> {
        let token = self.parser.parse(token).inspect_err(|e| {
            debug!(error = %e, "Rejected malformed token");
        })?;

        match validate(&token, &[&self.signed_with, &self.domain_claims]) {
            Ok(()) => Ok(true),
            Err(violation) => {
                debug!(violation = %violation, "Token failed validation");
                Ok(false)
            }
        }
    }

    /// Read the claim set out of a token without validating it
    ///
    /// Returns `None` on any failure, structural or semantic.
    pub fn extract_claims(&self, token: &str) -> Option<ClaimSet> {
        match self.parser.parse(token) {
            Ok(Token::Plain(token)) => ClaimSet::from_parsed_claims(token.claims().all()).ok(),
            Ok(Token::Encrypted(_)) => None,
            Err(e) => {
                debug!(error = %e, "Could not extract claims");
                None
            }
        }
    }
}
