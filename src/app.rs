//! # Router
//!
//! Routes, the static file fallback and the middleware stack. Layers are
//! listed innermost first, so a request passes them bottom to top. Only page
//! routes and the "Page not found" fallback sit behind the session layers.

use crate::handlers::{health::health_check, home::home, not_found, users};
use crate::middleware::{
    auth::{require_login, resolve_identity},
    errors::{error_boundary, panic_response},
    locals::populate_locals,
    security::security_headers,
};
use crate::session::manage_session;
use crate::state::AppState;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/account", get(users::account))
        .route_layer(from_fn(require_login));

    let pages = with_page_layers(
        Router::new()
            .route("/", get(home))
            .route("/register", get(users::show_register).post(users::register))
            .route("/login", get(users::show_login).post(users::login))
            .route("/logout", get(users::logout))
            .merge(protected),
        &state,
    );

    // Static assets are tried before "Page not found", which renders like
    // any other page
    let missing = with_page_layers(Router::new().fallback(not_found), &state)
        .with_state(state.clone());
    let assets = ServeDir::new(&state.config.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(missing);

    // Health checks and assets never load a session or read flash messages
    Router::new()
        .route("/health", get(health_check))
        .merge(pages)
        .fallback_service(assets)
        .layer(from_fn_with_state(state.security.clone(), security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Session, identity, locals and the error boundary around page routes
fn with_page_layers(routes: Router<AppState>, state: &AppState) -> Router<AppState> {
    routes
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(error_boundary))
        .layer(from_fn(populate_locals))
        .layer(from_fn_with_state(state.auth.clone(), resolve_identity))
        .layer(from_fn_with_state(state.sessions.clone(), manage_session))
}
