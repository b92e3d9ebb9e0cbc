//! # Error Boundary
//!
//! Last stop for failed responses: every error renders the same `error` page.

use crate::error::{AppError, ErrorPage};
use crate::view::{Locals, Page};
use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use std::any::Any;

/// Terminal error handling
///
/// Responses tagged by [`AppError`] render with their own status and message;
/// any other failure status (extractor rejections, unmatched methods) renders
/// the default page for that status. Successful responses pass through.
pub async fn error_boundary(
    Extension(locals): Extension<Locals>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    let page = match response.extensions().get::<ErrorPage>() {
        Some(page) => page.clone(),
        None if status.is_client_error() || status.is_server_error() => {
            ErrorPage::for_status(status)
        }
        None => return response,
    };

    (page.status(), Page::error(locals, &page)).into_response()
}

/// Response for a panicking handler, rendered by the boundary like any 500
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
