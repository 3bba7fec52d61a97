//! Core token types: algorithms, claim name tables and ACL resource kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::JwtError;

/// Signature algorithms accepted by Opencast for JWT login
///
/// Only asymmetric algorithms are supported; Opencast verifies tokens with the
/// public half of the key configured here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JwtAlgorithm {
    /// ECDSA using P-256 and SHA-256 (RFC 7518)
    #[default]
    #[serde(rename = "ES256")]
    ES256,

    /// ECDSA using P-384 and SHA-384 (RFC 7518)
    #[serde(rename = "ES384")]
    ES384,

    /// Edwards-curve signatures with Ed25519 (RFC 8037)
    #[serde(rename = "EdDSA")]
    EdDSA,
}

impl JwtAlgorithm {
    /// All supported algorithms, default first
    pub const ALL: [JwtAlgorithm; 3] = [Self::ES256, Self::ES384, Self::EdDSA];

    /// The `alg` header value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ES256 => "ES256",
            Self::ES384 => "ES384",
            Self::EdDSA => "EdDSA",
        }
    }

    /// Length in bytes of a raw signature produced by this algorithm
    #[must_use]
    pub fn signature_len(self) -> usize {
        match self {
            Self::ES256 | Self::EdDSA => 64,
            Self::ES384 => 96,
        }
    }

    /// Algorithm identifiers accepted by [`FromStr`]
    #[must_use]
    pub fn supported_ids() -> Vec<&'static str> {
        Self::ALL.iter().map(|alg| alg.as_str()).collect()
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.as_str() == s)
            .ok_or_else(|| JwtError::config(format!("JWT: Unsupported algorithm: {s}")))
    }
}

/// Claim names registered by RFC 7519 Section 4.1
pub mod registered {
    /// Audience
    pub const AUDIENCE: &str = "aud";
    /// Expiration time
    pub const EXPIRATION_TIME: &str = "exp";
    /// JWT ID
    pub const ID: &str = "jti";
    /// Issued at
    pub const ISSUED_AT: &str = "iat";
    /// Issuer
    pub const ISSUER: &str = "iss";
    /// Not before
    pub const NOT_BEFORE: &str = "nbf";
    /// Subject
    pub const SUBJECT: &str = "sub";

    /// Every registered claim name
    pub const ALL: [&str; 7] = [
        AUDIENCE,
        EXPIRATION_TIME,
        ID,
        ISSUED_AT,
        ISSUER,
        NOT_BEFORE,
        SUBJECT,
    ];

    /// Registered claims that carry a NumericDate
    pub const DATE_CLAIMS: [&str; 3] = [EXPIRATION_TIME, ISSUED_AT, NOT_BEFORE];

    /// Whether `name` is a registered claim
    #[must_use]
    pub fn is_registered(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Claim names understood by Opencast
pub mod domain {
    /// Expiration time (required)
    pub const EXP: &str = "exp";
    /// Not before
    pub const NBF: &str = "nbf";
    /// Opencast username
    pub const SUB: &str = "sub";
    /// Display name of the user
    pub const NAME: &str = "name";
    /// Email of the user
    pub const EMAIL: &str = "email";
    /// Role names
    pub const ROLES: &str = "roles";
    /// Merged event/series/playlist ACL entries
    pub const OC: &str = "oc";

    /// Allow-list of claims a claim set may contribute to a token
    pub const ALL: [&str; 7] = [EXP, NBF, SUB, NAME, EMAIL, ROLES, OC];

    /// Whether `name` is an Opencast claim
    #[must_use]
    pub fn is_domain_claim(name: &str) -> bool {
        ALL.contains(&name)
    }
}

/// Resource kinds that can carry ACL entries in the `oc` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Media event, prefix `e`
    Event,
    /// Series, prefix `s`
    Series,
    /// Playlist, prefix `p`
    Playlist,
}

impl ResourceKind {
    /// Bucket order used when merging into `oc`
    pub const ALL: [ResourceKind; 3] = [Self::Event, Self::Series, Self::Playlist];

    /// One-letter discriminator used in composite keys
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Self::Event => 'e',
            Self::Series => 's',
            Self::Playlist => 'p',
        }
    }

    /// Resource kind for a discriminator
    #[must_use]
    pub fn from_prefix(prefix: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }

    /// Build the `{prefix}:{id}` composite key
    #[must_use]
    pub fn composite_key(self, identifier: &str) -> String {
        format!("{}:{identifier}", self.prefix())
    }

    /// Split a composite key into its kind and identifier
    ///
    /// Returns `None` when the key has no single-character discriminator
    /// followed by `:`, or when the discriminator is unknown.
    #[must_use]
    pub fn split_composite_key(key: &str) -> Option<(Self, &str)> {
        let mut chars = key.chars();
        let prefix = chars.next()?;
        let rest = chars.as_str().strip_prefix(':')?;
        Self::from_prefix(prefix).map(|kind| (kind, rest))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Series => "series",
            Self::Playlist => "playlist",
        };
        f.write_str(name)
    }
}
