// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User registration and lookup.

use crate::error::{AppError, Result};
use crate::models::{NewUser, PublicUser};
use crate::services::password::hash_password;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(get_users).post(create_user))
        .route("/users/{user_id}", get(get_user))
}

/// Registration payload.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "email is invalid"))]
    pub email: String,
    #[validate(length(min = 6, max = 72, message = "password must be 6 to 72 characters"))]
    pub password: String,
}

/// Register a new user.
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    body.validate()?;

    let password_hash = hash_password(body.password, state.config.bcrypt_cost).await?;
    let user = state
        .users
        .create(NewUser {
            first_name: body.first_name.trim().to_string(),
            last_name: body.last_name.trim().to_string(),
            email: body.email.trim().to_lowercase(),
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List all users.
async fn get_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<PublicUser>>> {
    let users = state.users.get_all().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<PublicUser>> {
    let user = state
        .users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
    Ok(Json(user.into()))
}
