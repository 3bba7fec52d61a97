//! Parsed and freshly built token values

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::helpers::timestamp_from_value;
use crate::types::registered;

/// A decoded JSON object together with the exact text it was decoded from
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    data: Map<String, Value>,
    encoded: String,
}

impl DataSet {
    pub fn new(data: Map<String, Value>, encoded: impl Into<String>) -> Self {
        Self {
            data,
            encoded: encoded.into(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    /// Every decoded entry
    pub fn all(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The base64url segment as it appears in the compact token
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// Raw signature bytes and their base64url segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    bytes: Vec<u8>,
    encoded: String,
}

impl Signature {
    pub fn new(bytes: Vec<u8>, encoded: impl Into<String>) -> Self {
        Self {
            bytes,
            encoded: encoded.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

/// A signed (JWS) token
///
/// `Display` renders the compact `header.claims.signature` form.
#[derive(Debug, Clone, PartialEq)]
pub struct PlainToken {
    header: DataSet,
    claims: DataSet,
    signature: Signature,
}

impl PlainToken {
    pub fn new(header: DataSet, claims: DataSet, signature: Signature) -> Self {
        Self {
            header,
            claims,
            signature,
        }
    }

    pub fn header(&self) -> &DataSet {
        &self.header
    }

    pub fn claims(&self) -> &DataSet {
        &self.claims
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The `header.claims` text the signature covers
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header.encoded(), self.claims.encoded())
    }

    /// The `alg` header, if it is a string
    pub fn algorithm(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The `exp` claim as an instant
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.date_claim(registered::EXPIRATION_TIME)
    }

    /// The `iat` claim as an instant
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.date_claim(registered::ISSUED_AT)
    }

    /// The `nbf` claim as an instant
    pub fn not_before(&self) -> Option<DateTime<Utc>> {
        self.date_claim(registered::NOT_BEFORE)
    }

    /// Whether the token is expired at `now`; a token without `exp` never expires
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_some_and(|exp| now >= exp)
    }

    /// Audience values; a single string audience is returned as one element
    pub fn audiences(&self) -> Vec<&str> {
        match self.claims.get(registered::AUDIENCE) {
            Some(Value::String(aud)) => vec![aud.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Compact serialization
    pub fn to_compact(&self) -> String {
        format!("{}.{}", self.signing_input(), self.signature.encoded())
    }

    fn date_claim(&self, name: &str) -> Option<DateTime<Utc>> {
        self.claims.get(name).and_then(timestamp_from_value)
    }
}

impl fmt::Display for PlainToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.header.encoded(),
            self.claims.encoded(),
            self.signature.encoded()
        )
    }
}

/// A five-part JWE compact token
///
/// Only the protected header is decoded; the remaining segments are kept as
/// they were received.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptedToken {
    header: DataSet,
    encrypted_key: String,
    iv: String,
    ciphertext: String,
    tag: String,
}

impl EncryptedToken {
    pub fn new(
        header: DataSet,
        encrypted_key: impl Into<String>,
        iv: impl Into<String>,
        ciphertext: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            header,
            encrypted_key: encrypted_key.into(),
            iv: iv.into(),
            ciphertext: ciphertext.into(),
            tag: tag.into(),
        }
    }

    pub fn header(&self) -> &DataSet {
        &self.header
    }

    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }
}

impl fmt::Display for EncryptedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.header.encoded(),
            self.encrypted_key,
            self.iv,
            self.ciphertext,
            self.tag
        )
    }
}

/// A structurally decoded token
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Signed token with readable claims
    Plain(PlainToken),
    /// Encrypted token with opaque payload
    Encrypted(EncryptedToken),
}

impl Token {
    pub fn header(&self) -> &DataSet {
        match self {
            Token::Plain(token) => token.header(),
            Token::Encrypted(token) => token.header(),
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Token::Plain(_))
    }

    pub fn as_plain(&self) -> Option<&PlainToken> {
        match self {
            Token::Plain(token) => Some(token),
            Token::Encrypted(_) => None,
        }
    }

    pub fn into_plain(self) -> Option<PlainToken> {
        match self {
            Token::Plain(token) => Some(token),
            Token::Encrypted(_) => None,
        }
    }
}

impl From<PlainToken> for Token {
    fn from(token: PlainToken) -> Self {
        Token::Plain(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Plain(token) => token.fmt(f),
            Token::Encrypted(token) => token.fmt(f),
        }
    }
}
