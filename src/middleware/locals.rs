//! Per-request render locals: current user and flash messages.

use crate::auth::CurrentUser;
use crate::session::{
    flash::{self, FlashKind, FLASH_KEY},
    Session,
};
use crate::view::Locals;
use axum::{extract::Request, middleware::Next, response::Response, Extension};

/// Build the render context for this request
///
/// This is the only place flash messages are read, so every queued message
/// reaches exactly one render.
pub async fn populate_locals(
    Extension(CurrentUser(current_user)): Extension<CurrentUser>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    tracing::debug!(query = request.uri().query().unwrap_or(""), "populating locals");

    let locals = Locals {
        current_user,
        success: take_or_discard(&session, FlashKind::Success),
        error: take_or_discard(&session, FlashKind::Error),
    };

    request.extensions_mut().insert(locals);
    next.run(request).await
}

fn take_or_discard(session: &Session, kind: FlashKind) -> Vec<String> {
    flash::take(session, kind).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "discarding undecodable flash queue");
        session.remove_value(FLASH_KEY);
        Vec::new()
    })
}
