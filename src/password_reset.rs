// =============================================================================
// EloDex Backend - Password Reset Flow
// =============================================================================
// Three-step flow: request a 6-digit code, exchange it for a short-lived
// reset token, then confirm with the token and the new password. Codes and
// tokens both expire after 15 minutes; a reset record is single-use.
// =============================================================================

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::auth::hash_password;
use crate::error::AppError;
use crate::validators::is_strong_password;
use crate::AppState;

const CODE_TTL_MINUTES: i64 = 15;
const TOKEN_TTL_MINUTES: i64 = 15;

// -----------------------------------------------------------------------------
// Request/Response Types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    pub reset_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmResetRequest {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{n:06}")
}

fn is_code_format(code: &str) -> bool {
    code.len() == 6 && code.chars().all(|c| c.is_ascii_digit())
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

/// Issue a 6-digit reset code for a registered email.
pub async fn request_code(
    State(state): State<AppState>,
    Json(req): Json<RequestCodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = req.email.trim().to_lowercase();

    let player = state
        .db
        .find_player_by_email(&email)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    let code = generate_code();
    let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

    state
        .db
        .insert_reset_code(&player.id, &email, &code, expires_at)
        .await?;

    // Code delivery is an outbound mail concern; the API only logs the issue.
    tracing::info!(player_id = %player.id, "password reset code issued");

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Exchange a valid, unexpired code for a short-lived reset token.
pub async fn verify_code(
    State(state): State<AppState>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    let code = req.code.trim();

    if !is_code_format(code) {
        return Err(AppError::Validation("Code must be 6 digits".into()));
    }

    let reset = state
        .db
        .latest_reset_for_email(&email)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired code".into()))?;

    let now = Utc::now();
    if reset.used || reset.code_expires_at < now || reset.code != code {
        return Err(AppError::Validation("Invalid or expired code".into()));
    }

    let reset_token = uuid::Uuid::new_v4().to_string();
    let token_expires_at = now + Duration::minutes(TOKEN_TTL_MINUTES);

    state
        .db
        .attach_reset_token(&reset.id, &reset_token, token_expires_at)
        .await?;

    Ok(Json(VerifyCodeResponse { reset_token }))
}

/// Consume a reset token and set the new password.
pub async fn confirm_reset(
    State(state): State<AppState>,
    Json(req): Json<ConfirmResetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = req.email.trim().to_lowercase();

    if !is_strong_password(&req.new_password) {
        return Err(AppError::Validation(
            "Password must be at least 6 characters with uppercase, lowercase, number and special character".into(),
        ));
    }

    let reset = state
        .db
        .find_reset_by_token(&email, &req.reset_token)
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired reset token".into()))?;

    let expired = reset
        .token_expires_at
        .map_or(true, |exp| exp < Utc::now());
    if expired {
        return Err(AppError::Validation("Invalid or expired reset token".into()));
    }

    let password_hash = hash_password(&req.new_password)?;
    state
        .db
        .update_player_password(&reset.player_id, &password_hash)
        .await?;
    state.db.consume_reset(&reset.id).await?;

    tracing::info!(player_id = %reset.player_id, "password reset completed");

    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// Tests
// =============================================================================
