//! # Campground Server
//!
//! Server-rendered campground site: registration, password login, sessions
//! stored in SQLite behind a signed cookie, flash messages and a strict
//! content security policy.

mod app;         // Router and middleware stack
mod auth;        // Credential verification and identity (de)serialisation
mod config;      // Configuration from the environment
mod db;          // Connection pool, migrations and user queries
mod error;       // Error type and its HTTP mapping
mod handlers;    // Route handlers
mod middleware;  // Request/response interceptors
mod security;    // Content security policy and security headers
mod session;     // Signed-cookie sessions and flash messages
mod state;       // Shared application state
mod view;        // Render context for pages

use crate::config::Config;
use crate::state::AppState;
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Read first so a RUST_LOG in .env takes effect
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,yelp_camp_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Configuration loaded: {:?}", config);
    if config.is_production() && config.uses_default_secret() {
        tracing::warn!("SECRET is not set; session cookies are signed with the placeholder secret");
    }

    let app_state = AppState::new(config.clone()).await?;
    tracing::info!("Database connected");

    // Expired sessions are never loaded, but their rows stay until swept
    let sweeper = SqliteStore::new(app_state.db.clone());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            tracing::debug!("Sweeping expired sessions");
            if let Err(e) = sweeper.delete_expired().await {
                tracing::error!("Session sweep failed: {:?}", e);
            }
        }
    });

    let app = app::router(app_state);

    let bind_addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Serving on {}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
