// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, refresh, logout and access validation.
//!
//! Signed tokens alone cannot be revoked before they expire, so every issued
//! token id is also written to the session cache. A token is only honoured
//! while its id is still cached for the same user; logout and refresh
//! rotation revoke tokens by deleting those entries.

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::PublicUser;
use crate::services::password::verify_password;
use crate::services::session::{SessionCache, SessionNamespace};
use crate::services::token::{IssuedToken, TokenKind, TokenPair, TokenService};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub tokens: TokenPair,
    pub user: PublicUser,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    sessions: Arc<dyn SessionCache>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        sessions: Arc<dyn SessionCache>,
    ) -> Self {
        Self {
            users,
            tokens,
            sessions,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Check credentials and open a new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password.to_string(), user.password.clone()).await? {
            tracing::info!(user_id = user.id, "Login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.start_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResult {
            tokens,
            user: user.into(),
        })
    }

    /// Exchange a refresh token for a new pair. The presented refresh token
    /// is spent even if it has not expired yet.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let verified = self.tokens.verify(refresh_token, TokenKind::Refresh)?;

        self.require_session(SessionNamespace::Refresh, &verified.token_id, verified.user_id)
            .await?;

        // A concurrent refresh with the same token may have won the race.
        if !self
            .sessions
            .delete(SessionNamespace::Refresh, &verified.token_id)
            .await?
        {
            return Err(AppError::SessionExpired);
        }

        let tokens = self.start_session(verified.user_id).await?;
        tracing::info!(user_id = verified.user_id, "Session refreshed");
        Ok(tokens)
    }

    /// Revoke the access token and the refresh token issued with it.
    pub async fn logout(&self, access_token: &str) -> Result<u64, AppError> {
        let verified = self.tokens.verify(access_token, TokenKind::Access)?;

        self.require_session(SessionNamespace::Access, &verified.token_id, verified.user_id)
            .await?;

        self.sessions
            .delete(SessionNamespace::Access, &verified.token_id)
            .await?;
        if let Some(refresh_id) = &verified.refresh_id {
            // Already rotated away or expired is fine here.
            self.sessions
                .delete(SessionNamespace::Refresh, refresh_id)
                .await?;
        }

        tracing::info!(user_id = verified.user_id, "User logged out");
        Ok(verified.user_id)
    }

    /// Resolve an access token to its user id.
    pub async fn validate(&self, access_token: &str) -> Result<u64, AppError> {
        let verified = self.tokens.verify(access_token, TokenKind::Access)?;

        self.require_session(SessionNamespace::Access, &verified.token_id, verified.user_id)
            .await?;

        Ok(verified.user_id)
    }

    async fn start_session(&self, user_id: u64) -> Result<TokenPair, AppError> {
        let pair = self.tokens.issue_pair(user_id)?;
        self.store(SessionNamespace::Access, &pair.access, user_id)
            .await?;
        self.store(SessionNamespace::Refresh, &pair.refresh, user_id)
            .await?;
        Ok(pair)
    }

    async fn store(
        &self,
        namespace: SessionNamespace,
        token: &IssuedToken,
        user_id: u64,
    ) -> Result<(), AppError> {
        let ttl = (token.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.sessions
            .put(namespace, &token.token_id, user_id, ttl)
            .await
    }

    async fn require_session(
        &self,
        namespace: SessionNamespace,
        token_id: &str,
        user_id: u64,
    ) -> Result<(), AppError> {
        match self.sessions.get(namespace, token_id).await? {
            Some(owner) if owner == user_id => Ok(()),
            Some(owner) => {
                tracing::warn!(
                    %namespace,
                    token_user = user_id,
                    cached_user = owner,
                    "Session owner mismatch"
                );
                Err(AppError::SessionExpired)
            }
            None => Err(AppError::SessionExpired),
        }
    }
}
