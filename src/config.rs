//! # Configuration Management
//!
//! Configuration is read from the environment once at startup and then passed
//! explicitly (behind `Arc`) to every component that needs it. Nothing reads
//! the environment after bootstrap.
//!
//! ## Environment Variables
//! - `NODE_ENV`: deployment environment; anything but `production` loads `.env`
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3000)
//! - `DB_URL`: SQLite connection string for users and sessions
//! - `SECRET`: key material for signing the session cookie
//! - `CLOUDINARY_CLOUD_NAME`: image host account allowed by the security policy
//! - `PUBLIC_DIR`: directory served as static files

use crate::security::ContentSecurityPolicy;
use anyhow::{Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;
use time::Duration;

/// Placeholder signing secret used when `SECRET` is unset.
///
/// A real deployment must override it; startup logs a warning in production.
pub const DEFAULT_SECRET: &str = "thisshouldbeabettersecret";

/// Application configuration
///
/// Built once by [`Config::from_env`] and never mutated afterwards. The
/// security policy and session settings are derived here so the components
/// that use them receive plain values instead of reading globals.
#[derive(Clone)]
pub struct Config {
    /// Server host/IP address to bind to
    pub host: String,

    /// Server port number
    /// Default: 3000
    pub port: u16,

    /// SQLite database connection URL
    /// Format: "sqlite:filename.db?mode=rwc"
    pub database_url: String,

    /// Secret the session cookie signing key is derived from
    pub secret: String,

    /// Value of `NODE_ENV` (default: "development")
    pub environment: String,

    /// Directory of static assets served before the not-found fallback
    pub public_dir: PathBuf,

    /// Session cookie and persistence timing
    pub session: SessionSettings,

    /// Allow-list of external content origins
    pub content_security: ContentSecurityPolicy,
}

/// Session cookie and persistence settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Name of the session cookie
    pub cookie_name: String,

    /// Lifetime of the cookie and of a stored record after its last persist
    pub max_age: Duration,

    /// Minimum interval between writes of an unmodified session
    pub touch_after: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "pont".to_string(),
            max_age: Duration::days(7),
            touch_after: Duration::hours(24),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Outside production a `.env` file is loaded first (dotenvy does not
    /// error if the file is missing). Unset variables fall back to defaults;
    /// a malformed `PORT` is an error.
    ///
    /// ## Example .env file
    /// ```text
    /// PORT=3000
    /// DB_URL=sqlite:yelp-camp.db?mode=rwc
    /// SECRET=a-long-random-string
    /// CLOUDINARY_CLOUD_NAME=dcekpojms
    /// ```
    pub fn from_env() -> Result<Self> {
        if env::var("NODE_ENV").map_or(true, |v| v != "production") {
            dotenvy::dotenv().ok();
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a port number, got {raw:?}"))?,
            None => 3000,
        };

        let cloud_name =
            lookup("CLOUDINARY_CLOUD_NAME").unwrap_or_else(|| "dcekpojms".to_string());

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: lookup("DB_URL")
                .unwrap_or_else(|| "sqlite:yelp-camp.db?mode=rwc".to_string()),
            secret: lookup("SECRET").unwrap_or_else(|| DEFAULT_SECRET.to_string()),
            environment: lookup("NODE_ENV").unwrap_or_else(|| "development".to_string()),
            public_dir: lookup("PUBLIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            session: SessionSettings::default(),
            content_security: ContentSecurityPolicy::for_cloudinary(&cloud_name),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_SECRET
    }

    /// Get the socket address to bind the server to
    ///
    /// Example: "0.0.0.0:3000"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Hand-written so the signing secret never reaches the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("public_dir", &self.public_dir)
            .field("session", &self.session)
            .field("content_security", &self.content_security)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.database_url, "sqlite:yelp-camp.db?mode=rwc");
        assert!(config.uses_default_secret());
        assert!(!config.is_production());
        assert_eq!(config.session.cookie_name, "pont");
        assert_eq!(config.session.max_age, Duration::days(7));
        assert_eq!(config.session.touch_after, Duration::hours(24));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("DB_URL", "sqlite::memory:"),
            ("SECRET", "s3cret-value"),
            ("NODE_ENV", "production"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert!(!config.uses_default_secret());
        assert!(config.is_production());
    }

    #[test]
    fn malformed_port_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let config = Config::from_lookup(lookup_from(&[("SECRET", "hunter2-hunter2")])).unwrap();
        let printed = format!("{config:?}");

        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
