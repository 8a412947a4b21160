// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod password;
pub mod session;
pub mod storage;
pub mod token;

pub use auth::{AuthService, LoginResult};
pub use session::{MemorySessionCache, RedisSessionCache, SessionCache, SessionNamespace};
pub use storage::{FileStorage, LocalFileStorage};
pub use token::{TokenKind, TokenPair, TokenService};
