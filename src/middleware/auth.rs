//! # Identity Middleware
//!
//! Resolves the logged-in user from the session and guards routes that
//! require one.

use crate::auth::{Authenticator, CurrentUser, RETURN_TO_KEY, SESSION_USER_KEY};
use crate::error::AppError;
use crate::view::redirect;
use crate::session::{
    flash::{self, FlashKind},
    Session,
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    Extension,
};
use std::sync::Arc;

/// Resolve the session's identity token into [`CurrentUser`]
///
/// A token whose account no longer exists is dropped from the session. A
/// store failure leaves the request anonymous rather than failing it.
pub async fn resolve_identity(
    State(authenticator): State<Arc<dyn Authenticator>>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match session.get::<String>(SESSION_USER_KEY) {
        Ok(Some(token)) => match authenticator.deserialize(&token).await {
            Ok(identity) => Some(identity),
            Err(err) if err.is_internal() => {
                tracing::warn!(error = %err, "identity lookup failed, continuing anonymously");
                None
            }
            Err(_) => {
                tracing::debug!("session refers to a missing account, dropping it");
                session.remove_value(SESSION_USER_KEY);
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(error = %err, "undecodable identity token in session");
            session.remove_value(SESSION_USER_KEY);
            None
        }
    };

    request.extensions_mut().insert(CurrentUser(identity));
    next.run(request).await
}

/// Send anonymous callers to the login page, remembering where they were going
pub async fn require_login(
    Extension(current): Extension<CurrentUser>,
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if current.0.is_some() {
        return Ok(next.run(request).await);
    }

    session.insert(RETURN_TO_KEY, request.uri().to_string())?;
    flash::push(&session, FlashKind::Error, "You must be signed in first!")?;
    Ok(redirect("/login"))
}
