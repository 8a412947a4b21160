// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food API: a food-listing backend.
//!
//! Users register, log in with email and password, and publish food
//! listings with an optional image. Sessions use paired access/refresh
//! tokens whose ids are tracked in a cache so they can be revoked.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{FoodRepository, UserRepository};
use services::{AuthService, FileStorage};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserRepository>,
    pub foods: Arc<dyn FoodRepository>,
    pub auth: AuthService,
    pub storage: Arc<dyn FileStorage>,
}
