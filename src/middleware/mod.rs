//! # Middleware
//!
//! Applied in this order on the way in (outermost first):
//!
//! 1. `security`: policy headers on every response
//! 2. `crate::session::manage_session`: load / commit the session
//! 3. `auth::resolve_identity`: session token → [`crate::auth::CurrentUser`]
//! 4. `locals::populate_locals`: identity and flash messages → render context
//! 5. `errors::error_boundary`: failures → rendered error page
//!
//! Steps 2 to 5 wrap page routes only; `/health` and static assets get the
//! security headers and nothing else. `auth::require_login` is attached per
//! route.

pub mod auth;
pub mod errors;
pub mod locals;
pub mod security;
