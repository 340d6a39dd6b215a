// =============================================================================
// EloDex Backend - Player Profile Handlers
// =============================================================================

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::{PlayerResponse, PlayerType};
use crate::error::AppError;
use crate::AppState;

// -----------------------------------------------------------------------------
// Request Types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetPlayerTypeRequest {
    pub player_type: PlayerType,
}

#[derive(Debug, Deserialize)]
pub struct SetSelectedCharacterRequest {
    pub character_id: Option<String>,
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

/// Current player profile.
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PlayerResponse>, AppError> {
    let player = state
        .db
        .find_player_by_id(&user.user_id)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    Ok(Json(player.into()))
}

/// Switch the player's entitlement tier. A switch to FREE immediately
/// re-evaluates the downgrade rule and publishes the resulting snapshot.
pub async fn set_player_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SetPlayerTypeRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    state
        .db
        .find_player_by_id(&user.user_id)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    state.db.set_player_type(&user.user_id, req.player_type).await?;
    tracing::info!(player_id = %user.user_id, tier = req.player_type.key(), "player tier changed");

    state.enforcer.enforce(&user.user_id).await?;

    let snapshot = state.db.list_characters(&user.user_id).await?;
    state.feed.publish(&user.user_id, &snapshot);

    let player = state
        .db
        .find_player_by_id(&user.user_id)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    Ok(Json(player.into()))
}

/// Persist the selected character (or clear the selection).
pub async fn set_selected_character(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SetSelectedCharacterRequest>,
) -> Result<Json<PlayerResponse>, AppError> {
    if let Some(character_id) = &req.character_id {
        state
            .db
            .get_character(&user.user_id, character_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Character not found: {character_id}")))?;
    }

    state
        .db
        .set_selected_character(&user.user_id, req.character_id.as_deref())
        .await?;

    let player = state
        .db
        .find_player_by_id(&user.user_id)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    Ok(Json(player.into()))
}
