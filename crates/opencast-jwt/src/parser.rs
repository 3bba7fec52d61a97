//! Structural decoding of compact tokens
//!
//! The parser only checks shape: segment count, base64url, JSON objects and
//! the type of the registered date claims. Freshness and the Opencast claim
//! schema are checked by [`crate::validation`].

use serde_json::{Map, Value};
use tracing::debug;

use crate::Result;
use crate::errors::JwtError;
use crate::helpers::{base64url_decode, timestamp_from_value};
use crate::token::{DataSet, EncryptedToken, PlainToken, Signature, Token};
use crate::types::registered;

const ENCRYPTION_HEADER: &str = "enc";

/// Decodes compact token strings into [`Token`] values
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenParser;

impl TokenParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a compact token
    ///
    /// # Errors
    ///
    /// Returns [`JwtError::ParseError`] when the string is not a three-part
    /// JWS or five-part JWE, a segment is not unpadded base64url, the header
    /// or claims are not JSON objects, a date claim is not numeric, or a
    /// three-part token declares an `enc` header.
    pub fn parse(&self, compact: &str) -> Result<Token> {
        if compact.is_empty() {
            return Err(JwtError::parse("token is empty"));
        }

        let parts: Vec<&str> = compact.split('.').collect();
        match parts.as_slice() {
            [header, claims, signature] => {
                self.parse_plain(header, claims, signature).map(Token::Plain)
            }
            [header, encrypted_key, iv, ciphertext, tag] => {
                let header = decode_header(header)?;
                if !header.has(ENCRYPTION_HEADER) {
                    return Err(JwtError::parse(
                        "five-part token is missing the \"enc\" header",
                    ));
                }
                for segment in [encrypted_key, iv, ciphertext, tag] {
                    base64url_decode(segment)?;
                }
                debug!("Parsed encrypted token");
                Ok(Token::Encrypted(EncryptedToken::new(
                    header,
                    *encrypted_key,
                    *iv,
                    *ciphertext,
                    *tag,
                )))
            }
            _ => Err(JwtError::parse(format!(
                "expected 3 or 5 segments, got {}",
                parts.len()
            ))),
        }
    }

    fn parse_plain(&self, header: &str, claims: &str, signature: &str) -> Result<PlainToken> {
        let header = decode_header(header)?;
        if header.has(ENCRYPTION_HEADER) {
            return Err(JwtError::parse("encrypted tokens must have five segments"));
        }

        let claims = DataSet::new(decode_claims(claims)?, claims);
        let signature = Signature::new(base64url_decode(signature)?, signature);

        Ok(PlainToken::new(header, claims, signature))
    }
}

fn decode_object(segment: &str, what: &str) -> Result<Map<String, Value>> {
    let bytes = base64url_decode(segment)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(JwtError::parse(format!("{what} must be a JSON object"))),
        Err(e) => Err(JwtError::parse(format!("{what} is not valid JSON: {e}"))),
    }
}

fn decode_header(segment: &str) -> Result<DataSet> {
    Ok(DataSet::new(decode_object(segment, "header")?, segment))
}

fn decode_claims(segment: &str) -> Result<Map<String, Value>> {
    let mut claims = decode_object(segment, "claims")?;

    for name in registered::DATE_CLAIMS {
        match claims.get(name) {
            Some(value) if timestamp_from_value(value).is_none() => {
                return Err(JwtError::parse(format!(
                    "claim \"{name}\" is not a valid date: {value}"
                )));
            }
            _ => {}
        }
    }

    if let Some(Value::String(audience)) = claims.get(registered::AUDIENCE) {
        let audience = Value::Array(vec![Value::String(audience.clone())]);
        claims.insert(registered::AUDIENCE.to_string(), audience);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::base64url_encode;
    use serde_json::json;

    fn segment(value: &Value) -> String {
        base64url_encode(serde_json::to_vec(value).unwrap())
    }

    fn compact(header: &Value, claims: &Value) -> String {
        format!("{}.{}.{}", segment(header), segment(claims), base64url_encode([7u8; 64]))
    }

    #[test]
    fn test_parse_plain_token() {
        let header = json!({"typ": "JWT", "alg": "ES256"});
        let claims = json!({"exp": 2000, "aud": "opencast", "roles": ["ROLE_ADMIN"]});
        let text = compact(&header, &claims);

        let token = TokenParser::new().parse(&text).unwrap();
        let plain = token.as_plain().unwrap();
        assert_eq!(plain.algorithm(), Some("ES256"));
        assert_eq!(plain.signature().bytes(), &[7u8; 64]);
        assert_eq!(plain.claims().get("aud"), Some(&json!(["opencast"])));
        // the encoded segments are kept verbatim
        assert_eq!(plain.to_string(), text);
    }

    #[test]
    fn test_segment_count() {
        let parser = TokenParser::new();
        for input in ["", "abc", "a.b", "a.b.c.d", "a.b.c.d.e.f"] {
            assert!(matches!(
                parser.parse(input),
                Err(JwtError::ParseError { .. })
            ));
        }
    }

    #[test]
    fn test_invalid_segments() {
        let parser = TokenParser::new();
        let claims = segment(&json!({"exp": 1}));
        let header = segment(&json!({"alg": "ES256"}));

        assert!(parser.parse(&format!("!!!.{claims}.")).is_err());
        assert!(parser.parse(&format!("{header}=.{claims}.")).is_err());
        assert!(parser
            .parse(&format!("{}.{claims}.", segment(&json!([1, 2]))))
            .is_err());
        assert!(parser
            .parse(&format!("{}.{claims}.", base64url_encode("not json")))
            .is_err());
    }

    #[test]
    fn test_date_claims_must_be_numeric() {
        let header = json!({"alg": "ES256"});
        let parser = TokenParser::new();

        assert!(parser.parse(&compact(&header, &json!({"exp": "tomorrow"}))).is_err());
        assert!(parser.parse(&compact(&header, &json!({"nbf": true}))).is_err());
        assert!(parser.parse(&compact(&header, &json!({"iat": "1700000000"}))).is_ok());
    }

    #[test]
    fn test_enc_header_on_three_parts() {
        let header = json!({"alg": "ES256", "enc": "A128GCM"});
        let err = TokenParser::new()
            .parse(&compact(&header, &json!({"exp": 1})))
            .unwrap_err();
        assert_eq!(err.category(), "parse");
    }

    #[test]
    fn test_parse_encrypted_token() {
        let header = segment(&json!({"alg": "RSA-OAEP", "enc": "A256GCM"}));
        let text = format!("{header}.a2V5.aXY.Y2lwaGVy.dGFn");

        let token = TokenParser::new().parse(&text).unwrap();
        assert!(!token.is_plain());
        assert_eq!(token.to_string(), text);

        let no_enc = format!("{}.a2V5.aXY.Y2lwaGVy.dGFn", segment(&json!({"alg": "dir"})));
        assert!(TokenParser::new().parse(&no_enc).is_err());
    }
}
