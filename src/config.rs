// =============================================================================
// EloDex Backend - Configuration
// =============================================================================

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "127.0.0.1:7100")
    pub bind_address: String,

    /// Database URL (SQLite path)
    pub database_url: String,

    /// JWT secret for signing tokens
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: i64,

    /// Directory holding the static catalog tables
    /// (species.json, evolution_roots.json)
    pub data_dir: String,

    /// Root directory of the avatar object store
    pub media_root: String,

    /// Public base URL used to build avatar download links
    pub public_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "127.0.0.1:7100".into()),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:elodex.db".into()),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".into()),
            media_root: env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".into()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:7100".into()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
