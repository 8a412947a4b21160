//! Food model for storage and API.

use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Food row as stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Food {
    pub id: u64,
    /// Owner of the listing
    pub user_id: u64,
    /// Globally unique, soft-deleted rows included
    pub title: String,
    pub description: String,
    /// Reference URL returned by the file storage
    pub food_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fields needed to insert a food.
#[derive(Debug, Clone)]
pub struct NewFood {
    pub user_id: u64,
    pub title: String,
    pub description: String,
    pub food_image: Option<String>,
}

/// Mutable fields of a food. Owner and timestamps are managed by the store.
#[derive(Debug, Clone)]
pub struct FoodUpdate {
    pub title: String,
    pub description: String,
    pub food_image: Option<String>,
}

/// Food as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FoodResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub title: String,
    pub description: String,
    pub food_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Food> for FoodResponse {
    fn from(food: Food) -> Self {
        Self {
            id: food.id,
            user_id: food.user_id,
            title: food.title,
            description: food.description,
            food_image: food.food_image,
            created_at: format_utc_rfc3339(food.created_at),
            updated_at: format_utc_rfc3339(food.updated_at),
        }
    }
}
