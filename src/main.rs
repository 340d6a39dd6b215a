// =============================================================================
// EloDex Backend - API Server Entry Point
// =============================================================================
// Table of Contents:
// 1. Imports
// 2. Application State
// 3. Main Entry Point
// 4. Router Setup
// =============================================================================

mod auth;
mod catalog;
mod characters;
mod config;
mod db;
mod entitlement;
mod error;
mod feed;
mod password_reset;
mod players;
mod starters;
mod storage;
mod validators;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::catalog::Catalog;
use crate::config::Config;
use crate::db::Database;
use crate::entitlement::Enforcer;
use crate::feed::CharacterFeed;
use crate::storage::AvatarStore;

// -----------------------------------------------------------------------------
// 2. Application State
// -----------------------------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub catalog: Arc<Catalog>,
    pub feed: CharacterFeed,
    pub avatars: AvatarStore,
    pub enforcer: Arc<Enforcer>,
}

// -----------------------------------------------------------------------------
// 3. Main Entry Point
// -----------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _ = dotenvy::dotenv();

    // Load configuration
    let config = Config::from_env()?;
    let bind_addr = config.bind_address.clone();

    // Ensure database directory exists for SQLite
    if config.database_url.starts_with("sqlite:") {
        let db_path = config.database_url.trim_start_matches("sqlite:");
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }
    }

    // Initialize database
    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    // Load the species catalog and evolution-root index
    let catalog = Arc::new(Catalog::load(&config.data_dir)?);
    tracing::info!(species = catalog.len(), "species catalog loaded");

    let feed = CharacterFeed::new();
    let enforcer = Enforcer::new(db.clone());

    // Every published snapshot re-runs the downgrade rule; the handle must
    // outlive the server.
    let _enforcer_sub = entitlement::attach(Arc::clone(&enforcer), &feed);

    let media_root = config.media_root.clone();
    let avatars = AvatarStore::new(&media_root, config.public_base_url.clone());

    // Create app state
    let state = AppState {
        config: Arc::new(config),
        db,
        catalog,
        feed,
        avatars,
        enforcer,
    };

    // Build router
    let app = create_router(state, &media_root);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 EloDex API Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

// -----------------------------------------------------------------------------
// 4. Router Setup
// -----------------------------------------------------------------------------

fn create_router(state: AppState, media_root: &str) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Auth routes
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::get_current_user))
        .route("/api/auth/refresh", post(auth::refresh_token))
        // Password reset
        .route(
            "/api/auth/password/request-code",
            post(password_reset::request_code),
        )
        .route(
            "/api/auth/password/verify-code",
            post(password_reset::verify_code),
        )
        .route(
            "/api/auth/password/confirm",
            post(password_reset::confirm_reset),
        )
        // Player profile
        .route("/api/players/me", get(players::get_me))
        .route("/api/players/me/player-type", put(players::set_player_type))
        .route(
            "/api/players/me/selected-character",
            put(players::set_selected_character),
        )
        // Starter selection
        .route("/api/starters", get(starters::get_starters))
        // Characters API
        .route("/api/characters", get(characters::list_characters))
        .route("/api/characters", post(characters::create_character))
        .route("/api/characters/:id", get(characters::get_character))
        .route("/api/characters/:id", patch(characters::update_character))
        .route("/api/characters/:id", delete(characters::delete_character))
        .route("/api/characters/:id/avatar", post(characters::upload_avatar))
        // Avatar media
        .nest_service("/media", ServeDir::new(media_root))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
