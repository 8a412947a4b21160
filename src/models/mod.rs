// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod food;
pub mod user;

pub use food::{Food, FoodResponse, FoodUpdate, NewFood};
pub use user::{NewUser, PublicUser, User};
