// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cache: token id -> user id with per-entry TTL.
//!
//! Access and refresh entries live under separate key prefixes so each can
//! be revoked on its own. Expiry is left to the backend; an entry past its
//! TTL is simply gone.

use crate::error::AppError;
use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, IntoConnectionInfo};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Key space of a session entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionNamespace {
    Access,
    Refresh,
}

impl SessionNamespace {
    pub fn prefix(self) -> &'static str {
        match self {
            SessionNamespace::Access => "access",
            SessionNamespace::Refresh => "refresh",
        }
    }

    /// Full cache key for a token id.
    pub fn key(self, token_id: &str) -> String {
        format!("{}:{}", self.prefix(), token_id)
    }
}

impl fmt::Display for SessionNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Store `token_id -> user_id`, expiring after `ttl`.
    async fn put(
        &self,
        namespace: SessionNamespace,
        token_id: &str,
        user_id: u64,
        ttl: Duration,
    ) -> Result<(), AppError>;

    /// Owner of a live entry.
    async fn get(&self, namespace: SessionNamespace, token_id: &str)
        -> Result<Option<u64>, AppError>;

    async fn exists(&self, namespace: SessionNamespace, token_id: &str) -> Result<bool, AppError> {
        Ok(self.get(namespace, token_id).await?.is_some())
    }

    /// Remove an entry. Returns whether a live entry was removed.
    async fn delete(&self, namespace: SessionNamespace, token_id: &str) -> Result<bool, AppError>;
}

// ─── Redis ───────────────────────────────────────────────────────

/// Redis-backed session cache.
#[derive(Clone)]
pub struct RedisSessionCache {
    connection: ConnectionManager,
}

impl RedisSessionCache {
    /// Connect to Redis. Fails fast if the server is unreachable.
    pub async fn connect(info: impl IntoConnectionInfo) -> Result<Self, AppError> {
        let client = redis::Client::open(info).map_err(|e| {
            AppError::UpstreamUnavailable(format!("Invalid Redis connection info: {}", e))
        })?;

        let connection = tokio::time::timeout(CONNECT_TIMEOUT, client.get_connection_manager())
            .await
            .map_err(|_| AppError::UpstreamUnavailable("Timed out connecting to Redis".to_string()))?
            .map_err(redis_error)?;

        tracing::info!("Connected to Redis");
        Ok(Self { connection })
    }
}

fn redis_error(err: redis::RedisError) -> AppError {
    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        AppError::UpstreamUnavailable(format!("Redis: {}", err))
    } else {
        AppError::Internal(anyhow::anyhow!("Redis error: {}", err))
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn put(
        &self,
        namespace: SessionNamespace,
        token_id: &str,
        user_id: u64,
        ttl: Duration,
    ) -> Result<(), AppError> {
        // SET EX rejects a zero TTL
        let seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(namespace.key(token_id), user_id, seconds)
            .await
            .map_err(redis_error)
    }

    async fn get(
        &self,
        namespace: SessionNamespace,
        token_id: &str,
    ) -> Result<Option<u64>, AppError> {
        let mut conn = self.connection.clone();
        conn.get(namespace.key(token_id)).await.map_err(redis_error)
    }

    async fn delete(&self, namespace: SessionNamespace, token_id: &str) -> Result<bool, AppError> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn
            .del(namespace.key(token_id))
            .await
            .map_err(redis_error)?;
        Ok(removed > 0)
    }
}

// ─── In-memory ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Entry {
    user_id: u64,
    expires_at: Instant,
}

/// Session cache backed by a `DashMap`. Expired entries are treated as
/// absent; they are dropped when next touched and swept on every `put`, so
/// tokens that are never presented again do not pile up.
#[derive(Clone, Default)]
pub struct MemorySessionCache {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn put(
        &self,
        namespace: SessionNamespace,
        token_id: &str,
        user_id: u64,
        ttl: Duration,
    ) -> Result<(), AppError> {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);

        let expires_at = now.checked_add(ttl).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("session ttl {:?} out of range", ttl))
        })?;
        self.entries
            .insert(namespace.key(token_id), Entry { user_id, expires_at });
        Ok(())
    }

    async fn get(
        &self,
        namespace: SessionNamespace,
        token_id: &str,
    ) -> Result<Option<u64>, AppError> {
        let key = namespace.key(token_id);
        let now = Instant::now();
        let live = self
            .entries
            .get(&key)
            .map(|entry| (entry.expires_at > now).then_some(entry.user_id));

        match live {
            Some(Some(user_id)) => Ok(Some(user_id)),
            Some(None) => {
                self.entries.remove_if(&key, |_, entry| entry.expires_at <= now);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, namespace: SessionNamespace, token_id: &str) -> Result<bool, AppError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(&namespace.key(token_id))
            .is_some_and(|(_, entry)| entry.expires_at > now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_put_exists_delete() {
        let cache = MemorySessionCache::new();

        cache.put(SessionNamespace::Access, "abc", 9, HOUR).await.unwrap();
        assert!(cache.exists(SessionNamespace::Access, "abc").await.unwrap());
        assert_eq!(
            cache.get(SessionNamespace::Access, "abc").await.unwrap(),
            Some(9)
        );

        assert!(cache.delete(SessionNamespace::Access, "abc").await.unwrap());
        assert!(!cache.exists(SessionNamespace::Access, "abc").await.unwrap());
        assert!(!cache.delete(SessionNamespace::Access, "abc").await.unwrap());
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let cache = MemorySessionCache::new();

        cache.put(SessionNamespace::Access, "same-id", 1, HOUR).await.unwrap();
        cache.put(SessionNamespace::Refresh, "same-id", 1, HOUR).await.unwrap();

        cache.delete(SessionNamespace::Refresh, "same-id").await.unwrap();

        assert!(cache.exists(SessionNamespace::Access, "same-id").await.unwrap());
        assert!(!cache.exists(SessionNamespace::Refresh, "same-id").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = MemorySessionCache::new();

        cache
            .put(SessionNamespace::Access, "short", 3, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(cache.exists(SessionNamespace::Access, "short").await.unwrap());

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!cache.exists(SessionNamespace::Access, "short").await.unwrap());
        assert!(cache.is_empty(), "expired entry should be purged on read");
        assert!(!cache.delete(SessionNamespace::Access, "short").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_sweeps_expired_entries() {
        let cache = MemorySessionCache::new();

        for id in ["a", "b", "c"] {
            cache
                .put(SessionNamespace::Refresh, id, 1, Duration::from_millis(10))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 3);

        tokio::time::sleep(Duration::from_millis(30)).await;

        // Never read again, but gone after the next write
        cache.put(SessionNamespace::Access, "live", 2, HOUR).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.exists(SessionNamespace::Access, "live").await.unwrap());
    }

    #[test]
    fn test_key_format() {
        assert_eq!(SessionNamespace::Access.key("t1"), "access:t1");
        assert_eq!(SessionNamespace::Refresh.key("t1"), "refresh:t1");
    }
}
