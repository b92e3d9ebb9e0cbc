//! # Application State
//!
//! Resources shared by every request, built once at startup. Cloning is
//! cheap: the pool is reference counted and everything else sits behind `Arc`.

use crate::auth::{Authenticator, LocalStrategy, PasswordHasher};
use crate::config::Config;
use crate::db;
use crate::security::SecurityHeaders;
use crate::session::SessionManager;
use anyhow::Result;
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tower_sessions::SessionStore;
use tower_sessions_sqlx_store::SqliteStore;

#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (users and sessions)
    pub db: SqlitePool,

    /// Credential verification and identity (de)serialisation
    pub auth: Arc<dyn Authenticator>,

    /// Session loading and persistence
    pub sessions: SessionManager,

    /// Headers rendered from the content security policy
    pub security: Arc<SecurityHeaders>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Connect to the database, run both sets of migrations and wire the
    /// components together
    ///
    /// # Errors
    /// Fails if the database is unreachable, a migration fails, or the
    /// security policy contains an origin that is not a valid header value.
    pub async fn new(config: Config) -> Result<Self> {
        let db = db::connect(&config.database_url).await?;

        let session_store = SqliteStore::new(db.clone());
        session_store.migrate().await?;

        Self::assemble(config, db, Arc::new(session_store), PasswordHasher::default())
    }

    pub fn assemble(
        config: Config,
        db: SqlitePool,
        session_store: Arc<dyn SessionStore>,
        hasher: PasswordHasher,
    ) -> Result<Self> {
        let sessions = SessionManager::new(session_store, &config.session, &config.secret);
        let security = SecurityHeaders::from_policy(&config.content_security)?;
        let auth: Arc<dyn Authenticator> = Arc::new(LocalStrategy::new(db.clone(), hasher));

        Ok(AppState {
            db,
            auth,
            sessions,
            security: Arc::new(security),
            config: Arc::new(config),
        })
    }
}
