//! Validation edge cases
//!
//! Malformed tokens are errors, semantically invalid tokens are `false`, and
//! `extract_claims` never fails loudly.

mod common;

use std::sync::Arc;

use chrono::Duration;
use common::{admin_claims, epoch, generate_pem, handler_at_epoch, segment, with_claims};
use opencast_jwt::{
    ClaimSet, FixedClock, JwtAlgorithm, JwtError, Signer, SigningKey, TokenBuilder, TokenHandler,
    TokenParser,
};
use serde_json::json;

fn es256_handler() -> TokenHandler {
    handler_at_epoch(JwtAlgorithm::ES256, 60).0
}

/// Keep a real token's header and signature but swap in new claims
fn spliced_token(handler: &TokenHandler, claims: &serde_json::Value) -> String {
    let template = handler.issue(&admin_claims()).unwrap();
    format!(
        "{}.{}.{}",
        template.header().encoded(),
        segment(claims),
        template.signature().encoded()
    )
}

/// Test: expired token is `false`, not a parse error
#[test]
fn test_expired_token_is_false() {
    let (handler, clock) = handler_at_epoch(JwtAlgorithm::ES256, 60);
    let token = handler.issue_token(&admin_claims()).unwrap();

    clock.advance(Duration::minutes(5));
    assert_eq!(handler.validate_token(&token), Ok(false));
}

/// Test: exp at exactly now counts as expired
#[test]
fn test_expiry_boundary_is_exclusive() {
    let (handler, clock) = handler_at_epoch(JwtAlgorithm::EdDSA, 30);
    let token = handler.issue_token(&admin_claims()).unwrap();

    clock.set(epoch() + Duration::seconds(29));
    assert_eq!(handler.validate_token(&token), Ok(true));

    clock.set(epoch() + Duration::seconds(30));
    assert_eq!(handler.validate_token(&token), Ok(false));
}

/// Test: stripping the grants from a token fails validation
#[test]
fn test_stripped_grants_is_false() {
    let (handler, _clock) = handler_at_epoch(JwtAlgorithm::ES256, 60);
    let token = handler.issue_token(&admin_claims()).unwrap();
    let stripped = with_claims(&token, &json!({"exp": epoch().timestamp() + 60, "sub": "jdoe"}));

    assert_eq!(handler.validate_token(&stripped), Ok(false));
    assert!(handler.extract_claims(&stripped).is_none());
}

/// Test: claims without grants are rejected even with a valid signature
#[test]
fn test_missing_grants_with_valid_signature() {
    let pem = generate_pem(JwtAlgorithm::ES256);
    let handler = TokenHandler::new(&pem, None, None)
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(epoch())));
    let key = SigningKey::from_key_string(JwtAlgorithm::ES256, &pem).unwrap();

    let token = TokenBuilder::new()
        .set_expiration(epoch() + Duration::seconds(60))
        .set_subject("jdoe")
        .build(&JwtAlgorithm::ES256, &key)
        .unwrap()
        .to_string();

    assert_eq!(handler.validate_token(&token), Ok(false));
    assert!(handler.extract_claims(&token).is_none());

    let with_roles = TokenBuilder::new()
        .set_expiration(epoch() + Duration::seconds(60))
        .set_custom_claim("roles", ["ROLE_USER"])
        .unwrap()
        .build(&JwtAlgorithm::ES256, &key)
        .unwrap()
        .to_string();
    assert_eq!(handler.validate_token(&with_roles), Ok(true));
}

/// Test: a validly signed token without exp is rejected
#[test]
fn test_missing_exp_is_false() {
    let pem = generate_pem(JwtAlgorithm::ES384);
    let handler = TokenHandler::new(&pem, Some("ES384"), None).unwrap();
    let key = SigningKey::from_key_string(JwtAlgorithm::ES384, &pem).unwrap();

    let token = TokenBuilder::new()
        .set_custom_claim("roles", ["ROLE_ADMIN"])
        .unwrap()
        .build(&JwtAlgorithm::ES384, &key)
        .unwrap()
        .to_string();

    assert_eq!(handler.validate_token(&token), Ok(false));
    assert!(handler.extract_claims(&token).is_none());
}

/// Test: structurally malformed tokens are errors
#[test]
fn test_malformed_tokens_are_errors() {
    let handler = es256_handler();
    let header = segment(&json!({"typ": "JWT", "alg": "ES256"}));

    let inputs = [
        String::new(),
        "abc".to_string(),
        "a.b".to_string(),
        "a.b.c.d".to_string(),
        format!("{header}.%%%.sig"),
        format!("{header}.{}.", segment(&json!("just a string"))),
        format!("{header}.{}.", segment(&json!({"exp": "later", "roles": ["ROLE_ADMIN"]}))),
    ];

    for input in &inputs {
        let result = handler.validate_token(input);
        assert!(
            matches!(result, Err(JwtError::ParseError { .. })),
            "{input:?} should be a parse error, got {result:?}"
        );
        assert!(handler.extract_claims(input).is_none());
    }
}

/// Test: five-part encrypted tokens parse but never validate
#[test]
fn test_encrypted_token_is_false() {
    let handler = es256_handler();
    let header = segment(&json!({"alg": "RSA-OAEP", "enc": "A256GCM"}));
    let token = format!("{header}.ZW5jcnlwdGVkLWtleQ.aXY.Y2lwaGVydGV4dA.dGFn");

    assert!(!TokenParser::new().parse(&token).unwrap().is_plain());
    assert_eq!(handler.validate_token(&token), Ok(false));
    assert!(handler.extract_claims(&token).is_none());
}

/// Test: unsigned ("alg": "none") tokens are rejected
#[test]
fn test_unsigned_token_is_false() {
    let handler = es256_handler();
    let claims = json!({"exp": epoch().timestamp() + 60, "roles": ["ROLE_ADMIN"]});
    let token = format!(
        "{}.{}.",
        segment(&json!({"typ": "JWT", "alg": "none"})),
        segment(&claims)
    );

    assert_eq!(handler.validate_token(&token), Ok(false));
    // extraction still reads the claims
    let extracted = handler.extract_claims(&token).unwrap();
    assert_eq!(extracted.roles(), &["ROLE_ADMIN".to_string()]);
}

/// Test: a signature copied from another token does not verify
#[test]
fn test_spliced_signature_is_false() {
    let handler = es256_handler();
    let spliced = spliced_token(
        &handler,
        &json!({"exp": epoch().timestamp() + 60, "roles": ["ROLE_ADMIN", "ROLE_SUDO"]}),
    );

    assert_eq!(handler.validate_token(&spliced), Ok(false));
    assert!(handler.extract_claims(&spliced).is_some());
}

/// Test: unknown oc prefixes are dropped during extraction
#[test]
fn test_unknown_oc_prefix_dropped() {
    let handler = es256_handler();
    let token = format!(
        "{}.{}.",
        segment(&json!({"typ": "JWT", "alg": "ES256"})),
        segment(&json!({
            "exp": epoch().timestamp() + 60,
            "oc": {"x:1": ["read"], "e:2": ["write"]}
        }))
    );

    let extracted = handler.extract_claims(&token).unwrap();
    assert_eq!(extracted.event_acls().len(), 1);
    assert_eq!(extracted.event_acls()[0].identifier, "2");
    assert!(extracted.series_acls().is_empty());
    assert!(extracted.playlist_acls().is_empty());
}

/// Test: name and email without a subject are not extracted
#[test]
fn test_user_info_without_subject_is_dropped() {
    let handler = es256_handler();
    let token = format!(
        "{}.{}.",
        segment(&json!({"typ": "JWT", "alg": "ES256"})),
        segment(&json!({
            "exp": epoch().timestamp() + 60,
            "name": "N",
            "email": "e@x",
            "roles": ["ROLE_USER"]
        }))
    );

    let extracted = handler.extract_claims(&token).unwrap();
    assert_eq!(extracted.subject(), None);
    assert_eq!(extracted.name(), None);
    assert_eq!(extracted.email(), None);
    assert_eq!(extracted.roles(), &["ROLE_USER".to_string()]);
}

/// Test: issuing a claim set without grants is a schema error
#[test]
fn test_issue_without_grants_is_schema_error() {
    let handler = es256_handler();
    let mut claims = ClaimSet::new();
    claims.set_identity("jdoe", None, None);

    assert!(matches!(
        handler.issue_token(&claims),
        Err(JwtError::SchemaError { .. })
    ));
}

/// Test: the signer reported in the header is the one that signed
#[test]
fn test_header_alg_comes_from_signer() {
    let (handler, _clock) = handler_at_epoch(JwtAlgorithm::EdDSA, 60);
    let token = handler.issue(&admin_claims()).unwrap();

    assert_eq!(token.algorithm(), Some(JwtAlgorithm::EdDSA.algorithm_id()));
}
