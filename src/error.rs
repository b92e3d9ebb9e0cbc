//! # Error Handling
//!
//! Every failure a handler can signal is an [`AppError`] variant. Converting
//! one into a response logs the internal detail, picks a status code and a
//! client-safe message, and tags the response with an [`ErrorPage`] extension.
//! The error boundary middleware turns tagged responses into the rendered
//! error page, so no internal detail ever reaches the client.

use crate::auth::{AuthError, RegistrationError};
use crate::session::SessionError;
use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Message shown when an error carries nothing safe to display
pub const DEFAULT_MESSAGE: &str = "Oh no, Something went wrong";

/// Message shown for unmatched routes
pub const NOT_FOUND_MESSAGE: &str = "Page not found";

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input to a route (400)
    #[error("{0}")]
    Validation(String),

    /// Login failure (401)
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Registration refused (400), or its store failure (500)
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Unmatched route or missing resource (404)
    #[error("{0}")]
    NotFound(String),

    /// Persistent store unreachable or failing (500)
    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    /// Session handle unavailable or undecodable (500)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Anything else unexpected (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found() -> Self {
        AppError::NotFound(NOT_FOUND_MESSAGE.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(err) if err.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Registration(err) if err.is_internal() => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Registration(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Session(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message that is safe to show to the client
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Auth(err) if err.is_internal() => DEFAULT_MESSAGE.to_string(),
            AppError::Registration(err) if err.is_internal() => DEFAULT_MESSAGE.to_string(),
            AppError::Auth(_) | AppError::Registration(_) => self.to_string(),
            AppError::Store(_) | AppError::Session(_) | AppError::Internal(_) => {
                DEFAULT_MESSAGE.to_string()
            }
        }
    }

    pub fn page(&self) -> ErrorPage {
        ErrorPage {
            status_code: self.status_code().as_u16(),
            message: self.public_message(),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Render context of the error template: `{ statusCode, message }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPage {
    pub status_code: u16,
    pub message: String,
}

impl ErrorPage {
    /// Error page for a failure response that carried no [`AppError`]
    ///
    /// An unmatched method is reported like an unmatched path.
    pub fn for_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => ErrorPage {
                status_code: StatusCode::NOT_FOUND.as_u16(),
                message: NOT_FOUND_MESSAGE.to_string(),
            },
            other => ErrorPage {
                status_code: other.as_u16(),
                message: DEFAULT_MESSAGE.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let page = self.page();

        if page.status().is_server_error() {
            tracing::error!(error = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, status = page.status_code, "request rejected");
        }

        // Bare rendering for responses that never pass the error boundary
        let mut response = (
            page.status(),
            Json(json!({ "view": "error", "err": &page })),
        )
            .into_response();
        response.extensions_mut().insert(page);
        response
    }
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;
