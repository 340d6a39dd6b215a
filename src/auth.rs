// =============================================================================
// EloDex Backend - Authentication Handlers
// =============================================================================

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::PlayerResponse;
use crate::error::AppError;
use crate::validators::{
    is_strong_password, is_valid_cpf, is_valid_dob, is_valid_email, normalize_digits,
};
use crate::AppState;

// -----------------------------------------------------------------------------
// JWT Claims
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Player ID
    pub exp: i64,     // Expiry timestamp
    pub iat: i64,     // Issued at
}

// -----------------------------------------------------------------------------
// Auth Extractor
// -----------------------------------------------------------------------------

/// Authenticated player extracted from JWT token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get Authorization header
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization header"))?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or((StatusCode::UNAUTHORIZED, "Invalid authorization format"))?;

        // Get JWT secret from environment (fallback for extractor)
        let secret = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "default-dev-secret".to_string());

        // Validate token
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.claims.sub,
        })
    }
}

// -----------------------------------------------------------------------------
// Request/Response Types
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
    /// Date of birth, DD/MM/YYYY
    pub dob: String,
    /// CPF, digits only (punctuation tolerated)
    pub national_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub player: PlayerResponse,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

// -----------------------------------------------------------------------------
// Helper Functions
// -----------------------------------------------------------------------------

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal)
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AppError::Internal)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a JWT token for a player.
pub fn generate_token(user_id: &str, secret: &str, expiry_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiry_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal)
}

/// Validate a JWT token and extract claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Extract token from Authorization header.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// All registration input checks. Resolved locally before any database call.
fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.display_name.trim().is_empty() {
        return Err(AppError::Validation("Display name is required".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if !is_strong_password(&req.password) {
        return Err(AppError::Validation(
            "Password must be at least 6 characters with uppercase, lowercase, number and special character".into(),
        ));
    }
    if !is_valid_dob(&req.dob) {
        return Err(AppError::Validation(
            "Date of birth must be a valid DD/MM/YYYY date".into(),
        ));
    }
    if !is_valid_cpf(&req.national_id) {
        return Err(AppError::Validation("Invalid CPF".into()));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

/// Register a new player. New accounts start on the FREE tier.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate_registration(&req)?;

    let email = req.email.trim().to_lowercase();

    // Check if player exists
    if state.db.find_player_by_email(&email).await?.is_some() {
        return Err(AppError::PlayerExists);
    }

    // Hash password
    let password_hash = hash_password(&req.password)?;

    // Create player profile
    let player_id = uuid::Uuid::new_v4().to_string();
    let player = state
        .db
        .create_player(
            &player_id,
            req.display_name.trim(),
            &email,
            &password_hash,
            &req.dob,
            &normalize_digits(&req.national_id),
        )
        .await?;

    tracing::info!(player_id = %player.id, "player registered");

    // Generate token
    let token = generate_token(&player.id, &state.config.jwt_secret, state.config.jwt_expiry_hours)?;

    Ok(Json(AuthResponse {
        token,
        player: player.into(),
    }))
}

/// Login with email and password.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();

    // Find player
    let player = state
        .db
        .find_player_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Verify password
    if !verify_password(&req.password, &player.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    // Generate token
    let token = generate_token(&player.id, &state.config.jwt_secret, state.config.jwt_expiry_hours)?;

    Ok(Json(AuthResponse {
        token,
        player: player.into(),
    }))
}

/// Get current player from token.
pub async fn get_current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PlayerResponse>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    let claims = validate_token(&token, &state.config.jwt_secret)?;

    let player = state
        .db
        .find_player_by_id(&claims.sub)
        .await?
        .ok_or(AppError::PlayerNotFound)?;

    Ok(Json(player.into()))
}

/// Refresh auth token.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, AppError> {
    let token = extract_token(&headers).ok_or(AppError::InvalidToken)?;
    let claims = validate_token(&token, &state.config.jwt_secret)?;

    // Generate new token
    let new_token = generate_token(&claims.sub, &state.config.jwt_secret, state.config.jwt_expiry_hours)?;

    Ok(Json(RefreshResponse { token: new_token }))
}

// =============================================================================
// Tests
// =============================================================================
