//! # Database Models
//!
//! Row types for the `users` table and the public identity derived from them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account, exactly as stored
///
/// Never serialised to clients: it carries the password hash. Use
/// [`Identity`] for anything that leaves the server.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Unique login name
    pub username: String,

    /// Unique contact address
    pub email: String,

    /// `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`
    pub password_hash: String,

    /// RFC3339 timestamps
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now().to_rfc3339();

        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// The authenticated caller as seen by handlers and templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<User> for Identity {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}
