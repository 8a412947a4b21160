// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food listing routes.
//!
//! Create and update take `multipart/form-data` with `title`, `description`
//! and an optional `food_image` file. Only the owner may change or delete a
//! listing.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Food, FoodResponse, FoodUpdate, NewFood, PublicUser};
use crate::routes::MessageResponse;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Request body cap for create and update, image included.
pub const MAX_UPLOAD_BYTES: usize = 8_192_000;

/// Routes that need an authenticated user and accept uploads.
pub fn upload_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/food", post(create_food))
        .route("/food/{food_id}", put(update_food))
}

/// Routes that need an authenticated user.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/food/{food_id}", delete(delete_food))
}

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/food", get(get_all_food))
        .route("/food/{food_id}", get(get_food_and_creator))
}

// ─── Form parsing ────────────────────────────────────────────

#[derive(Debug, Default, Validate)]
struct FoodForm {
    #[validate(length(min = 1, max = 100, message = "title is required"))]
    title: String,
    #[validate(length(min = 1, message = "description is required"))]
    description: String,
    image: Option<ImageUpload>,
}

#[derive(Debug)]
struct ImageUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(err.body_text())
    }
}

async fn read_food_form(mut multipart: Multipart) -> Result<FoodForm> {
    let mut form = FoodForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => form.title = field.text().await.map_err(multipart_error)?.trim().to_string(),
            "description" => {
                form.description = field.text().await.map_err(multipart_error)?.trim().to_string()
            }
            "food_image" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    form.validate()?;
    Ok(form)
}

async fn store_image(state: &AppState, image: Option<ImageUpload>) -> Result<Option<String>> {
    match image {
        Some(image) => state
            .storage
            .upload(&image.filename, &image.content_type, &image.bytes)
            .await
            .map(Some),
        None => Ok(None),
    }
}

/// Remove a just-stored image when the write that would reference it failed.
async fn discard_image_on_error<T>(
    state: &AppState,
    image: Option<&str>,
    result: Result<T>,
) -> Result<T> {
    if let (Err(_), Some(url)) = (&result, image) {
        if let Err(e) = state.storage.remove(url).await {
            tracing::warn!(error = %e, url, "Failed to remove orphaned upload");
        }
    }
    result
}

/// Load a live food and check the caller owns it.
async fn owned_food(state: &AppState, food_id: u64, user: AuthUser) -> Result<Food> {
    let food = state
        .foods
        .get_by_id(food_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Food {} not found", food_id)))?;

    if food.user_id != user.user_id {
        tracing::warn!(
            food_id,
            owner = food.user_id,
            caller = user.user_id,
            "Rejected change to food owned by another user"
        );
        return Err(AppError::Forbidden);
    }
    Ok(food)
}

// ─── Handlers ────────────────────────────────────────────────

async fn create_food(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<FoodResponse>)> {
    // A valid session for a user that has since vanished.
    if state.users.get_by_id(user.user_id).await?.is_none() {
        return Err(AppError::Unauthorized);
    }

    let form = read_food_form(multipart).await?;
    let food_image = store_image(&state, form.image).await?;

    let food = state
        .foods
        .create(NewFood {
            user_id: user.user_id,
            title: form.title,
            description: form.description,
            food_image: food_image.clone(),
        })
        .await;
    let food = discard_image_on_error(&state, food_image.as_deref(), food).await?;

    tracing::info!(food_id = food.id, user_id = user.user_id, "Food created");
    Ok((StatusCode::CREATED, Json(food.into())))
}

async fn update_food(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(food_id): Path<u64>,
    multipart: Multipart,
) -> Result<Json<FoodResponse>> {
    let existing = owned_food(&state, food_id, user).await?;

    let form = read_food_form(multipart).await?;
    let new_image = store_image(&state, form.image).await?;
    let food_image = new_image.clone().or_else(|| existing.food_image.clone());

    let food = state
        .foods
        .update(
            food_id,
            FoodUpdate {
                title: form.title,
                description: form.description,
                food_image,
            },
        )
        .await;
    let food = discard_image_on_error(&state, new_image.as_deref(), food).await?;

    // The replaced image is no longer referenced
    if let (Some(_), Some(old)) = (&new_image, &existing.food_image) {
        if let Err(e) = state.storage.remove(old).await {
            tracing::warn!(error = %e, url = %old, "Failed to remove replaced upload");
        }
    }

    tracing::info!(food_id, user_id = user.user_id, "Food updated");
    Ok(Json(food.into()))
}

/// Food together with the user who posted it.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FoodWithCreator {
    pub food: FoodResponse,
    pub creator: Option<PublicUser>,
}

async fn get_food_and_creator(
    State(state): State<Arc<AppState>>,
    Path(food_id): Path<u64>,
) -> Result<Json<FoodWithCreator>> {
    let food = state
        .foods
        .get_by_id(food_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Food {} not found", food_id)))?;

    let creator = state.users.get_by_id(food.user_id).await?.map(PublicUser::from);

    Ok(Json(FoodWithCreator {
        food: food.into(),
        creator,
    }))
}

async fn get_all_food(State(state): State<Arc<AppState>>) -> Result<Json<Vec<FoodResponse>>> {
    let foods = state.foods.get_all().await?;
    Ok(Json(foods.into_iter().map(FoodResponse::from).collect()))
}

async fn delete_food(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(food_id): Path<u64>,
) -> Result<Json<MessageResponse>> {
    owned_food(&state, food_id, user).await?;
    state.foods.delete(food_id).await?;

    tracing::info!(food_id, user_id = user.user_id, "Food deleted");
    Ok(Json(MessageResponse {
        message: "food deleted".to_string(),
    }))
}
