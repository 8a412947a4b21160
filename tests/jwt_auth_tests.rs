// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT compatibility tests.
//!
//! These tests decode tokens issued by `TokenService` with plain
//! `jsonwebtoken`, and feed hand-built tokens back into it, so a change to
//! the claim layout or algorithm shows up here first.

use food_api::error::AppError;
use food_api::services::token::Claims;
use food_api::services::{TokenKind, TokenService};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn service() -> TokenService {
    TokenService::new(
        SIGNING_KEY,
        Duration::from_secs(900),
        Duration::from_secs(7 * 24 * 3600),
    )
}

fn sign(claims: &Claims, key: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key),
    )
    .expect("Failed to create JWT")
}

fn claims(kind: TokenKind, exp_offset: i64) -> Claims {
    let now = chrono::Utc::now().timestamp();
    Claims {
        sub: "12345678".to_string(),
        jti: uuid::Uuid::new_v4().to_string(),
        typ: kind,
        iat: now,
        exp: now + exp_offset,
        rid: None,
    }
}

#[test]
fn test_issued_pair_decodes_with_plain_jsonwebtoken() {
    let pair = service().issue_pair(12345678).unwrap();

    let key = DecodingKey::from_secret(SIGNING_KEY);
    let validation = Validation::new(Algorithm::HS256);

    let access = decode::<Claims>(&pair.access.token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility")
        .claims;
    let refresh = decode::<Claims>(&pair.refresh.token, &key, &validation)
        .unwrap()
        .claims;

    assert_eq!(access.sub, "12345678");
    assert_eq!(access.typ, TokenKind::Access);
    assert_eq!(access.jti, pair.access.token_id);
    assert_eq!(access.rid.as_deref(), Some(pair.refresh.token_id.as_str()));
    assert_eq!(access.exp - access.iat, 900);

    assert_eq!(refresh.typ, TokenKind::Refresh);
    assert_eq!(refresh.jti, pair.refresh.token_id);
    assert!(refresh.rid.is_none());
    assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    assert_ne!(access.jti, refresh.jti);
}

#[test]
fn test_hand_built_token_verifies() {
    let token = sign(&claims(TokenKind::Access, 60), SIGNING_KEY);

    let verified = service().verify(&token, TokenKind::Access).unwrap();

    assert_eq!(verified.user_id, 12345678);
    assert!(verified.refresh_id.is_none());
}

#[test]
fn test_wrong_key_is_rejected() {
    let token = sign(&claims(TokenKind::Access, 60), b"some_other_key_that_is_32_bytes!");

    assert!(matches!(
        service().verify(&token, TokenKind::Access),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_expired_token_is_reported_as_expired() {
    let token = sign(&claims(TokenKind::Refresh, -5), SIGNING_KEY);

    assert!(matches!(
        service().verify(&token, TokenKind::Refresh),
        Err(AppError::ExpiredToken)
    ));
}

#[test]
fn test_non_numeric_subject_is_rejected() {
    let mut c = claims(TokenKind::Access, 60);
    c.sub = "someone".to_string();
    let token = sign(&c, SIGNING_KEY);

    assert!(matches!(
        service().verify(&token, TokenKind::Access),
        Err(AppError::InvalidToken)
    ));
}

#[test]
fn test_other_algorithm_is_rejected() {
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims(TokenKind::Access, 60),
        &EncodingKey::from_secret(SIGNING_KEY),
    )
    .unwrap();

    assert!(matches!(
        service().verify(&token, TokenKind::Access),
        Err(AppError::InvalidToken)
    ));
}
