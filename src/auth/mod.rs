//! # Authentication
//!
//! Credential verification sits behind the [`Authenticator`] trait so the
//! login flow does not care how identities are stored. The only strategy
//! today is [`LocalStrategy`]: username + password against the `users` table.
//!
//! ## Session contract
//! After login the session holds the serialised identity (its id) under
//! [`SESSION_USER_KEY`]. Every request deserialises it back into an
//! [`Identity`]; the identity is dropped again when the request ends.

pub mod local;
pub mod password;

pub use local::LocalStrategy;
pub use password::PasswordHasher;

use crate::db::models::Identity;
use crate::session::{Session, SessionError};
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinError;

/// Session key holding the serialised identity
pub const SESSION_USER_KEY: &str = "user";

/// Session key holding the path to continue to after login
pub const RETURN_TO_KEY: &str = "returnTo";

/// Login failure
///
/// `NotFound` and `BadCredential` display the same text on purpose: callers
/// must not reveal which one happened.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password or username is incorrect")]
    NotFound,

    #[error("Password or username is incorrect")]
    BadCredential,

    #[error("identity store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("password hashing task failed: {0}")]
    Hashing(#[from] JoinError),
}

impl AuthError {
    /// Failures of the service itself rather than of the caller's credentials
    pub fn is_internal(&self) -> bool {
        matches!(self, AuthError::Store(_) | AuthError::Hashing(_))
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("A user with the given username or email is already registered")]
    DuplicateIdentifier,

    #[error("Password must be at least {} characters", local::MIN_SECRET_LEN)]
    WeakSecret,

    #[error("identity store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("password hashing task failed: {0}")]
    Hashing(#[from] JoinError),
}

impl RegistrationError {
    pub fn is_internal(&self) -> bool {
        matches!(self, RegistrationError::Store(_) | RegistrationError::Hashing(_))
    }
}

/// Account details submitted for registration
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Identity, AuthError>;

    /// Reduce an identity to the token kept in the session
    fn serialize(&self, identity: &Identity) -> String;

    async fn deserialize(&self, token: &str) -> Result<Identity, AuthError>;

    async fn register(&self, candidate: NewUser, secret: &str) -> Result<Identity, RegistrationError>;
}

/// The identity resolved for the current request, if any
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<Identity>);

/// Bind `identity` to the session under a fresh session id
pub fn log_in(
    session: &Session,
    authenticator: &dyn Authenticator,
    identity: &Identity,
) -> Result<(), SessionError> {
    session.cycle_id();
    session.insert(SESSION_USER_KEY, authenticator.serialize(identity))
}

pub fn log_out(session: &Session) {
    session.remove_value(SESSION_USER_KEY);
    session.cycle_id();
}
