//! # Opencast JWT
//!
//! Issues and validates the JSON Web Tokens Opencast accepts for JWT-based
//! login. A token carries the user's identity, roles and per-resource access
//! control entries (`oc` claim) and is signed with an asymmetric key.
//!
//! ## Entry points
//!
//! The REST client talks to this crate through [`TokenHandler`]:
//!
//! - [`TokenHandler::issue_token`] turns a [`ClaimSet`] into a compact token
//! - [`TokenHandler::validate_token`] checks signature, expiry and claims
//! - [`TokenHandler::extract_claims`] reads a claim set back without validating
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use opencast_jwt::{ClaimSet, TokenHandler};
//!
//! # fn main() -> opencast_jwt::Result<()> {
//! # let pem = "";
//! let handler = TokenHandler::new(pem, Some("ES256"), Some(3600))?;
//!
//! let mut claims = ClaimSet::new();
//! claims
//!     .set_identity("jdoe", Some("John Doe"), None)
//!     .set_event_acls([("1234", ["read"])])
//!     .set_expiry(Utc::now() + Duration::minutes(5));
//!
//! let token = handler.issue_token(&claims)?;
//! assert!(handler.validate_token(&token)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - `types` - algorithms, claim name tables, ACL resource kinds
//! - `claims` - the Opencast claim model
//! - `builder` - immutable token builder
//! - `parser` - structural decoding of compact tokens
//! - `validation` - semantic constraints on parsed tokens
//! - `keys` / `signer` - key loading and ES256 / ES384 / EdDSA signatures
//! - `handler` - facade combining the above
//! - `config` - the serde `jwt` configuration section

pub mod builder;
pub mod claims;
pub mod clock;
pub mod config;
pub mod errors;
pub mod handler;
pub mod helpers;
pub mod keys;
pub mod parser;
pub mod signer;
pub mod token;
pub mod types;
pub mod validation;

pub use builder::TokenBuilder;
pub use claims::{AclEntry, ClaimSet};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::JwtConfig;
pub use errors::*;
pub use handler::TokenHandler;
pub use keys::{SigningKey, VerificationKey};
pub use parser::TokenParser;
pub use signer::Signer;
pub use token::{DataSet, EncryptedToken, PlainToken, Signature, Token};
pub use types::{JwtAlgorithm, ResourceKind};
pub use validation::{Constraint, ConstraintViolation, DomainClaimsConstraint, SignedWith, validate};

/// Result type for token operations
pub type Result<T> = std::result::Result<T, JwtError>;

/// `typ` header value
pub const TOKEN_TYPE: &str = "JWT";

/// Token lifetime used when neither the claim set nor the configuration sets one
pub const DEFAULT_EXPIRY_SECONDS: i64 = 15;
