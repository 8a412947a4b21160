// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Handlers only see the repository traits below; `MySqlStore` backs them in
//! production and `MemoryStore` in tests and local development.

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

use crate::error::AppError;
use crate::models::{Food, FoodUpdate, NewFood, NewUser, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Table names as constants.
pub mod tables {
    pub const USERS: &str = "users";
    pub const FOOD: &str = "food";
}

/// Unique index names, also used as the keys of constraint violations.
pub mod constraints {
    pub const UNIQUE_TITLE: &str = "unique_title";
    pub const UNIQUE_EMAIL: &str = "email_taken";
}

pub(crate) const FOOD_TITLE_TAKEN: &str = "food title already taken";
pub(crate) const TITLE_TAKEN: &str = "title already taken";
pub(crate) const EMAIL_TAKEN: &str = "email already taken";

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user, failing with a constraint violation on a taken email.
    async fn create(&self, user: NewUser) -> Result<User, AppError>;

    async fn get_by_id(&self, id: u64) -> Result<Option<User>, AppError>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// All users ordered by id.
    async fn get_all(&self) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait FoodRepository: Send + Sync {
    /// Insert a food, failing with a constraint violation on a taken title.
    async fn create(&self, food: NewFood) -> Result<Food, AppError>;

    /// Soft-deleted foods are reported as absent.
    async fn get_by_id(&self, id: u64) -> Result<Option<Food>, AppError>;

    /// All live foods ordered by id.
    async fn get_all(&self) -> Result<Vec<Food>, AppError>;

    /// Overwrite the mutable fields of a food.
    ///
    /// Fails with `NotFound` for unknown ids and with a constraint violation
    /// when the new title belongs to another food; the row is untouched in
    /// both cases.
    async fn update(&self, id: u64, update: FoodUpdate) -> Result<Food, AppError>;

    /// Soft delete. Fails with `NotFound` when the food is absent.
    async fn delete(&self, id: u64) -> Result<(), AppError>;
}

/// Both repositories, sharing one backend.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub foods: Arc<dyn FoodRepository>,
}

impl Repositories {
    pub fn mysql(store: MySqlStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            foods: store,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            foods: store,
        }
    }
}
