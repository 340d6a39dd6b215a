// =============================================================================
// EloDex Backend - Characters API
// =============================================================================
// CRUD over a player's character collection plus avatar upload. Every
// mutation publishes a fresh ordered snapshot to the character feed, which
// re-runs the entitlement downgrade rule.
// =============================================================================

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::db::{Character, CharacterChanges, NewCharacter, Player, StarterPokemon};
use crate::entitlement::max_characters;
use crate::error::AppError;
use crate::starters::{resolve_starter, ClassType, Region, StarterSelection};
use crate::AppState;

// -----------------------------------------------------------------------------
// Request/Response Types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequest {
    pub name: String,
    pub avatar_url: Option<String>,
    pub region: Region,
    pub class_type: ClassType,
    pub starter: StarterSelection,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub region: Option<Region>,
    pub class_type: Option<ClassType>,
    pub starter: Option<StarterSelection>,
}

#[derive(Debug, Serialize)]
pub struct CharacterResponse {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub region: String,
    pub class_type: String,
    pub starter_pokemon: StarterPokemon,
    pub locked: bool,
    pub locked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expire_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Character> for CharacterResponse {
    fn from(c: Character) -> Self {
        let starter_pokemon = c.starter();
        Self {
            id: c.id,
            name: c.name,
            avatar_url: c.avatar_url,
            region: c.region,
            class_type: c.class_type,
            starter_pokemon,
            locked: c.expire_at.is_some(),
            locked_at: c.locked_at,
            expire_at: c.expire_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

async fn load_player(state: &AppState, user: &AuthUser) -> Result<Player, AppError> {
    state
        .db
        .find_player_by_id(&user.user_id)
        .await?
        .ok_or(AppError::PlayerNotFound)
}

/// Publish the player's current ordered snapshot to the feed.
async fn publish_snapshot(state: &AppState, player_id: &str) -> Result<(), AppError> {
    let snapshot = state.db.list_characters(player_id).await?;
    state.feed.publish(player_id, &snapshot);
    Ok(())
}

fn character_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Character not found: {id}"))
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

/// Create a character. Enforces the tier quota and resolves the starter
/// selection against the catalog.
pub async fn create_character(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateCharacterRequest>,
) -> Result<Json<CharacterResponse>, AppError> {
    let player = load_player(&state, &user).await?;
    let tier = player.player_type();

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("Character name is required".into()));
    }

    let existing = state.db.list_characters(&player.id).await?;
    if existing.len() >= max_characters(tier) {
        return Err(AppError::Validation(format!(
            "{} players can have at most {} character(s)",
            tier.key(),
            max_characters(tier)
        )));
    }

    let starter = resolve_starter(&state.catalog, tier, req.region, req.class_type, &req.starter)?;

    let input = NewCharacter {
        name,
        avatar_url: req.avatar_url.filter(|u| !u.trim().is_empty()),
        region: req.region.key().to_string(),
        class_type: req.class_type.key().to_string(),
        starter,
    };

    let character = state.db.create_character(&player.id, &input).await?;
    tracing::info!(player_id = %player.id, character_id = %character.id, "character created");

    publish_snapshot(&state, &player.id).await?;

    Ok(Json(character.into()))
}

/// Full ordered snapshot of the player's characters.
pub async fn list_characters(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let characters = state.db.list_characters(&user.user_id).await?;
    let responses: Vec<CharacterResponse> = characters.into_iter().map(Into::into).collect();
    Ok(Json(serde_json::json!({ "characters": responses })))
}

/// Get a single character by ID.
pub async fn get_character(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CharacterResponse>, AppError> {
    let character = state
        .db
        .get_character(&user.user_id, &id)
        .await?
        .ok_or_else(|| character_not_found(&id))?;

    Ok(Json(character.into()))
}

/// Partial update. A replaced starter goes through the same tier rules as at
/// creation, evaluated against the merged region and class.
pub async fn update_character(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateCharacterRequest>,
) -> Result<Json<CharacterResponse>, AppError> {
    let player = load_player(&state, &user).await?;
    let existing = state
        .db
        .get_character(&player.id, &id)
        .await?
        .ok_or_else(|| character_not_found(&id))?;

    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Character name is required".into()));
        }
    }

    let starter = match &req.starter {
        Some(selection) => {
            let region = req
                .region
                .or_else(|| Region::from_key(&existing.region))
                .ok_or_else(|| AppError::Validation("Unknown region".into()))?;
            let class_type = req
                .class_type
                .or_else(|| ClassType::from_key(&existing.class_type))
                .ok_or_else(|| AppError::Validation("Unknown class".into()))?;

            Some(resolve_starter(
                &state.catalog,
                player.player_type(),
                region,
                class_type,
                selection,
            )?)
        }
        None => None,
    };

    let changes = CharacterChanges {
        name: req.name.map(|n| n.trim().to_string()),
        avatar_url: None,
        region: req.region.map(|r| r.key().to_string()),
        class_type: req.class_type.map(|c| c.key().to_string()),
        starter,
        locked_at: None,
        expire_at: None,
    };

    let character = state
        .db
        .update_character(&player.id, &id, &changes)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => character_not_found(&id),
            other => AppError::Database(other),
        })?;

    publish_snapshot(&state, &player.id).await?;

    Ok(Json(character.into()))
}

/// Hard delete a character.
pub async fn delete_character(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.db.delete_character(&user.user_id, &id).await? {
        return Err(character_not_found(&id));
    }

    tracing::info!(player_id = %user.user_id, character_id = %id, "character deleted");
    publish_snapshot(&state, &user.user_id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Upload a character avatar. The raw request body is the image; the stored
/// URL is persisted onto the character record and returned.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.is_empty() {
        return Err(AppError::Validation("Avatar image body is empty".into()));
    }

    state
        .db
        .get_character(&user.user_id, &id)
        .await?
        .ok_or_else(|| character_not_found(&id))?;

    let url = state.avatars.put_avatar(&user.user_id, &id, &body).await?;

    state
        .db
        .update_character(
            &user.user_id,
            &id,
            &CharacterChanges {
                avatar_url: Some(url.clone()),
                ..Default::default()
            },
        )
        .await?;

    publish_snapshot(&state, &user.user_id).await?;

    Ok(Json(serde_json::json!({ "avatar_url": url })))
}
