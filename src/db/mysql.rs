// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MySQL-backed repositories.
//!
//! Uniqueness is enforced by the unique indexes created in [`MySqlStore::migrate`];
//! duplicate-key errors are translated into constraint violations keyed by
//! the index name.

use super::{
    constraints, tables, FoodRepository, UserRepository, EMAIL_TAKEN, FOOD_TITLE_TAKEN,
    TITLE_TAKEN,
};
use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::models::{Food, FoodUpdate, NewFood, NewUser, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

const USER_COLUMNS: &str = "id, first_name, last_name, email, password, created_at, updated_at";
const FOOD_COLUMNS: &str =
    "id, user_id, title, description, food_image, created_at, updated_at, deleted_at";

/// MySQL database client.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Connect using the supplied connection parameters.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name)
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::UpstreamUnavailable(format!("Failed to connect to MySQL: {}", e))
            })?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.name,
            "Connected to MySQL"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool (integration tests).
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), AppError> {
        let users = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                email VARCHAR(100) NOT NULL,
                password VARCHAR(100) NOT NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                UNIQUE KEY {} (email)
            )",
            tables::USERS,
            constraints::UNIQUE_EMAIL
        );
        let food = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                user_id BIGINT UNSIGNED NOT NULL,
                title VARCHAR(100) NOT NULL,
                description TEXT NOT NULL,
                food_image VARCHAR(255) NULL,
                created_at DATETIME(6) NOT NULL,
                updated_at DATETIME(6) NOT NULL,
                deleted_at DATETIME(6) NULL,
                UNIQUE KEY {} (title),
                KEY idx_food_user_id (user_id)
            )",
            tables::FOOD,
            constraints::UNIQUE_TITLE
        );

        for statement in [users, food] {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }

        tracing::info!("Database schema is up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_food(&self, id: u64) -> Result<Option<Food>, AppError> {
        sqlx::query_as::<_, Food>(&format!(
            "SELECT {} FROM {} WHERE id = ? AND deleted_at IS NULL",
            FOOD_COLUMNS,
            tables::FOOD
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }
}

/// Map driver errors: unreachable backends become `UpstreamUnavailable`,
/// everything else is internal.
fn db_error(err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => AppError::UpstreamUnavailable(err.to_string()),
        other => AppError::Internal(anyhow::anyhow!("database error: {}", other)),
    }
}

/// Translate a duplicate-key error on `index` into a constraint violation.
fn unique_violation(err: sqlx::Error, index: &str, field: &str, message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        // MySQL reports "Duplicate entry '..' for key 'table.index'"
        if db_err.is_unique_violation() && db_err.message().contains(index) {
            return AppError::constraint(field, message);
        }
    }
    db_error(err)
}

#[async_trait]
impl UserRepository for MySqlStore {
    async fn create(&self, user: NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            "INSERT INTO {} (first_name, last_name, email, password, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            tables::USERS
        ))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(
                e,
                constraints::UNIQUE_EMAIL,
                constraints::UNIQUE_EMAIL,
                EMAIL_TAKEN,
            )
        })?;

        Ok(User {
            id: result.last_insert_id(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password: user.password_hash,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM {} WHERE id = ?",
            USER_COLUMNS,
            tables::USERS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM {} WHERE email = ?",
            USER_COLUMNS,
            tables::USERS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn get_all(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM {} ORDER BY id",
            USER_COLUMNS,
            tables::USERS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }
}

#[async_trait]
impl FoodRepository for MySqlStore {
    async fn create(&self, food: NewFood) -> Result<Food, AppError> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, title, description, food_image, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            tables::FOOD
        ))
        .bind(food.user_id)
        .bind(&food.title)
        .bind(&food.description)
        .bind(&food.food_image)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(
                e,
                constraints::UNIQUE_TITLE,
                constraints::UNIQUE_TITLE,
                FOOD_TITLE_TAKEN,
            )
        })?;

        let id = result.last_insert_id();
        tracing::debug!(food_id = id, user_id = food.user_id, "Food created");

        Ok(Food {
            id,
            user_id: food.user_id,
            title: food.title,
            description: food.description,
            food_image: food.food_image,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    async fn get_by_id(&self, id: u64) -> Result<Option<Food>, AppError> {
        self.fetch_food(id).await
    }

    async fn get_all(&self) -> Result<Vec<Food>, AppError> {
        sqlx::query_as::<_, Food>(&format!(
            "SELECT {} FROM {} WHERE deleted_at IS NULL ORDER BY id",
            FOOD_COLUMNS,
            tables::FOOD
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn update(&self, id: u64, update: FoodUpdate) -> Result<Food, AppError> {
        // rows_affected counts changed rows only, so existence is checked
        // separately afterwards.
        sqlx::query(&format!(
            "UPDATE {} SET title = ?, description = ?, food_image = ?, updated_at = ? \
             WHERE id = ? AND deleted_at IS NULL",
            tables::FOOD
        ))
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.food_image)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(
                e,
                constraints::UNIQUE_TITLE,
                constraints::UNIQUE_TITLE,
                TITLE_TAKEN,
            )
        })?;

        self.fetch_food(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("food {}", id)))
    }

    async fn delete(&self, id: u64) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
            tables::FOOD
        ))
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("food {}", id)));
        }
        Ok(())
    }
}
