//! # HTTP Request Handlers
//!
//! - `home`: landing page
//! - `users`: registration, login, logout and the account page
//! - `health`: liveness probe
//!
//! Page handlers read the render context from the [`crate::view::Locals`]
//! extension and return a [`crate::view::Page`]. Form handlers answer with a
//! redirect and leave their outcome in a flash message.

pub mod health;
pub mod home;
pub mod users;

use crate::error::AppError;

/// Fallback for every unmatched route
pub async fn not_found() -> AppError {
    AppError::not_found()
}
