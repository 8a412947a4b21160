// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store with the same constraints as the MySQL schema.
//!
//! Unique columns compare case-insensitively, like MySQL's default
//! collation, and soft-deleted foods keep their title reserved.

use super::{
    constraints, FoodRepository, UserRepository, EMAIL_TAKEN, FOOD_TITLE_TAKEN, TITLE_TAKEN,
};
use crate::error::AppError;
use crate::models::{Food, FoodUpdate, NewFood, NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    users: BTreeMap<u64, User>,
    foods: BTreeMap<u64, Food>,
    next_user_id: u64,
    next_food_id: u64,
}

impl Tables {
    fn title_taken(&self, title: &str, except: Option<u64>) -> bool {
        self.foods
            .values()
            .any(|f| Some(f.id) != except && f.title.eq_ignore_ascii_case(title))
    }
}

/// Memory-backed implementation of both repositories.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.lock()?;

        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::constraint(constraints::UNIQUE_EMAIL, EMAIL_TAKEN));
        }

        tables.next_user_id += 1;
        let now = Utc::now();
        let record = User {
            id: tables.next_user_id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }
}

#[async_trait]
impl FoodRepository for MemoryStore {
    async fn create(&self, food: NewFood) -> Result<Food, AppError> {
        let mut tables = self.lock()?;

        if tables.title_taken(&food.title, None) {
            return Err(AppError::constraint(
                constraints::UNIQUE_TITLE,
                FOOD_TITLE_TAKEN,
            ));
        }

        tables.next_food_id += 1;
        let now = Utc::now();
        let record = Food {
            id: tables.next_food_id,
            user_id: food.user_id,
            title: food.title,
            description: food.description,
            food_image: food.food_image,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.foods.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Food>, AppError> {
        Ok(self
            .lock()?
            .foods
            .get(&id)
            .filter(|f| f.deleted_at.is_none())
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Food>, AppError> {
        Ok(self
            .lock()?
            .foods
            .values()
            .filter(|f| f.deleted_at.is_none())
            .cloned()
            .collect())
    }

    async fn update(&self, id: u64, update: FoodUpdate) -> Result<Food, AppError> {
        let mut tables = self.lock()?;

        if !tables
            .foods
            .get(&id)
            .is_some_and(|f| f.deleted_at.is_none())
        {
            return Err(AppError::NotFound(format!("food {}", id)));
        }
        if tables.title_taken(&update.title, Some(id)) {
            return Err(AppError::constraint(constraints::UNIQUE_TITLE, TITLE_TAKEN));
        }

        let food = tables
            .foods
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("food {}", id)))?;
        food.title = update.title;
        food.description = update.description;
        food.food_image = update.food_image;
        food.updated_at = Utc::now();
        Ok(food.clone())
    }

    async fn delete(&self, id: u64) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        match tables.foods.get_mut(&id) {
            Some(food) if food.deleted_at.is_none() => {
                food.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(AppError::NotFound(format!("food {}", id))),
        }
    }
}
