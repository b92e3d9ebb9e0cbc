//! # User Handlers
//!
//! Registration, login and logout. Outcomes are reported through flash
//! messages on the page the handler redirects to.

use crate::auth::{self, NewUser, RETURN_TO_KEY};
use crate::error::AppResult;
use crate::session::{
    flash::{self, FlashKind},
    Session,
};
use crate::state::AppState;
use crate::view::{redirect, Locals, Page};
use axum::{
    extract::{rejection::FormRejection, State},
    response::Response,
    Extension, Form,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// GET /register
pub async fn show_register(Extension(locals): Extension<Locals>) -> Page {
    Page::new("users/register", locals)
}

/// POST /register
///
/// A new account is logged in straight away.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = form?;
    let username = form.username.trim();
    let email = form.email.trim();
    if username.is_empty() || email.is_empty() {
        flash::push(&session, FlashKind::Error, "Username and email are required")?;
        return Ok(redirect("/register"));
    }

    let candidate = NewUser {
        username: username.to_string(),
        email: email.to_string(),
    };

    match state.auth.register(candidate, &form.password).await {
        Ok(identity) => {
            auth::log_in(&session, state.auth.as_ref(), &identity)?;
            flash::push(&session, FlashKind::Success, "Welcome to Yelp Camp!")?;
            Ok(redirect("/"))
        }
        Err(err) if err.is_internal() => Err(err.into()),
        Err(err) => {
            flash::push(&session, FlashKind::Error, err.to_string())?;
            Ok(redirect("/register"))
        }
    }
}

/// GET /login
pub async fn show_login(Extension(locals): Extension<Locals>) -> Page {
    Page::new("users/login", locals)
}

/// POST /login
///
/// Unknown usernames and wrong passwords get the same flash message and the
/// same redirect.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = form?;
    match state.auth.authenticate(form.username.trim(), &form.password).await {
        Ok(identity) => {
            let return_to: Option<String> = session.remove(RETURN_TO_KEY)?;
            auth::log_in(&session, state.auth.as_ref(), &identity)?;
            flash::push(&session, FlashKind::Success, "welcome back!")?;

            let target = return_to
                .filter(|path| is_local_path(path))
                .unwrap_or_else(|| "/".to_string());
            Ok(redirect(&target))
        }
        Err(err) if err.is_internal() => Err(err.into()),
        Err(err) => {
            tracing::info!(username = %form.username, "failed login attempt");
            flash::push(&session, FlashKind::Error, err.to_string())?;
            Ok(redirect("/login"))
        }
    }
}

/// GET /logout
pub async fn logout(session: Session) -> AppResult<Response> {
    auth::log_out(&session);
    flash::push(&session, FlashKind::Success, "Goodbye!")?;
    Ok(redirect("/"))
}

/// GET /account (login required)
pub async fn account(Extension(locals): Extension<Locals>) -> Page {
    Page::new("users/account", locals)
}

/// Only same-site paths are followed after login
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

#[cfg(test)]
mod tests {
    use super::is_local_path;

    #[test]
    fn return_paths_must_stay_on_site() {
        assert!(is_local_path("/account"));
        assert!(is_local_path("/account?tab=reviews"));
        assert!(!is_local_path("//evil.example/"));
        assert!(!is_local_path("/\\evil.example/"));
        assert!(!is_local_path("https://evil.example/"));
    }
}
