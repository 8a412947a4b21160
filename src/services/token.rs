// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Signed access and refresh tokens.
//!
//! Both token kinds are HS256 JWTs carrying the user id, a random token id
//! and a type tag. An access token issued as part of a pair also names the
//! refresh token it was issued with, so logout can revoke both.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Distinguishes the two token lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Token ID, the session cache key
    pub jti: String,
    pub typ: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Refresh token ID issued alongside this access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Access and refresh token issued together.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Claims of a token that passed signature, expiry and type checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: u64,
    pub token_id: String,
    pub refresh_id: Option<String>,
}

/// Issues and verifies tokens with a single signing key.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl TokenService {
    pub fn new(signing_key: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            access_ttl: to_chrono(access_ttl),
            refresh_ttl: to_chrono(refresh_ttl),
        }
    }

    /// Override TTLs with signed durations, which lets tests mint tokens that
    /// are already expired.
    pub fn with_ttls(mut self, access_ttl: chrono::Duration, refresh_ttl: chrono::Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn issue_access_token(&self, user_id: u64) -> Result<IssuedToken, AppError> {
        self.sign(TokenKind::Access, user_id, None)
    }

    pub fn issue_refresh_token(&self, user_id: u64) -> Result<IssuedToken, AppError> {
        self.sign(TokenKind::Refresh, user_id, None)
    }

    /// Issue a refresh token and an access token linked to it.
    pub fn issue_pair(&self, user_id: u64) -> Result<TokenPair, AppError> {
        let refresh = self.issue_refresh_token(user_id)?;
        let access = self.sign(TokenKind::Access, user_id, Some(refresh.token_id.clone()))?;
        Ok(TokenPair { access, refresh })
    }

    /// Check signature, expiry and type tag of `token`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<VerifiedToken, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            }
        })?;
        let claims = data.claims;

        if claims.typ != kind {
            tracing::debug!(expected = ?kind, got = ?claims.typ, "Token type mismatch");
            return Err(AppError::InvalidToken);
        }

        let user_id = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

        Ok(VerifiedToken {
            user_id,
            token_id: claims.jti,
            refresh_id: claims.rid,
        })
    }

    fn sign(
        &self,
        kind: TokenKind,
        user_id: u64,
        refresh_id: Option<String>,
    ) -> Result<IssuedToken, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("token lifetime {} out of range", ttl))
        })?;
        let token_id = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            jti: token_id.clone(),
            typ: kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            rid: refresh_id,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            token_id,
            expires_at,
        })
    }
}

fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

    fn service() -> TokenService {
        TokenService::new(KEY, Duration::from_secs(900), Duration::from_secs(604_800))
    }

    #[test]
    fn test_access_token_roundtrip() {
        let tokens = service();
        let issued = tokens.issue_access_token(42).unwrap();

        let verified = tokens.verify(&issued.token, TokenKind::Access).unwrap();
        assert_eq!(verified.user_id, 42);
        assert_eq!(verified.token_id, issued.token_id);
        assert_eq!(verified.refresh_id, None);
    }

    #[test]
    fn test_pair_links_access_to_refresh() {
        let tokens = service();
        let pair = tokens.issue_pair(7).unwrap();

        let access = tokens.verify(&pair.access.token, TokenKind::Access).unwrap();
        let refresh = tokens.verify(&pair.refresh.token, TokenKind::Refresh).unwrap();

        assert_eq!(access.refresh_id.as_deref(), Some(refresh.token_id.as_str()));
        assert_ne!(access.token_id, refresh.token_id);
        assert!(pair.refresh.expires_at > pair.access.expires_at);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let tokens = service();
        let pair = tokens.issue_pair(7).unwrap();

        assert!(matches!(
            tokens.verify(&pair.refresh.token, TokenKind::Access),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            tokens.verify(&pair.access.token, TokenKind::Refresh),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let tokens = service();
        let issued = tokens.issue_access_token(1).unwrap();

        let mut tampered = issued.token.clone();
        tampered.pop();
        tampered.push(if issued.token.ends_with('A') { 'B' } else { 'A' });

        assert!(matches!(
            tokens.verify(&tampered, TokenKind::Access),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            tokens.verify("not.a.jwt", TokenKind::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_signed_with_other_key_is_invalid() {
        let other = TokenService::new(
            b"another_signing_key_32_bytes_!!!",
            Duration::from_secs(900),
            Duration::from_secs(900),
        );
        let issued = other.issue_access_token(1).unwrap();

        assert!(matches!(
            service().verify(&issued.token, TokenKind::Access),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let tokens = service().with_ttls(chrono::Duration::seconds(-10), chrono::Duration::seconds(-10));
        let issued = tokens.issue_refresh_token(1).unwrap();

        assert!(matches!(
            tokens.verify(&issued.token, TokenKind::Refresh),
            Err(AppError::ExpiredToken)
        ));
    }

    #[test]
    fn test_huge_ttl_is_an_error_not_a_panic() {
        let tokens = TokenService::new(
            KEY,
            Duration::from_secs(1_000_000_000_000_000),
            Duration::from_secs(u64::MAX),
        );

        assert!(matches!(
            tokens.issue_access_token(1),
            Err(AppError::Internal(_))
        ));
        assert!(matches!(tokens.issue_pair(1), Err(AppError::Internal(_))));
    }
}
