// =============================================================================
// EloDex Backend - Database Layer
// =============================================================================
// Document hierarchy of the original store is flattened into two tables:
// players/{playerId}            -> players
// players/{playerId}/characters -> characters (player_id foreign key)
// plus password_resets for the three-step reset flow.
// =============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

// -----------------------------------------------------------------------------
// Models
// -----------------------------------------------------------------------------

/// Player entitlement tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayerType {
    Free,
    Vip,
}

impl PlayerType {
    pub fn key(&self) -> &'static str {
        match self {
            PlayerType::Free => "FREE",
            PlayerType::Vip => "VIP",
        }
    }

    /// Anything that is not exactly "VIP" is treated as FREE.
    pub fn from_key(value: &str) -> PlayerType {
        if value.trim().to_uppercase() == "VIP" {
            PlayerType::Vip
        } else {
            PlayerType::Free
        }
    }
}

/// Player profile row. One per authenticated account, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: String,
    pub player_type: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub dob: String,
    pub national_id: String,
    pub selected_character_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn player_type(&self) -> PlayerType {
        PlayerType::from_key(&self.player_type)
    }
}

/// Player response (without sensitive fields).
#[derive(Debug, Clone, Serialize)]
pub struct PlayerResponse {
    pub id: String,
    pub player_type: PlayerType,
    pub display_name: String,
    pub email: String,
    pub dob: String,
    pub selected_character_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Player> for PlayerResponse {
    fn from(player: Player) -> Self {
        let player_type = player.player_type();
        Self {
            id: player.id,
            player_type,
            display_name: player.display_name,
            email: player.email,
            dob: player.dob,
            selected_character_id: player.selected_character_id,
            created_at: player.created_at,
        }
    }
}

/// Starter creature carried by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarterPokemon {
    pub species_id: i64,
    pub species_name: String,
    pub nickname: String,
    pub ability_id: String,
    pub nature: String,
    pub gender: String,
}

/// Character row. Owned exclusively by one player.
///
/// A non-null `expire_at` means the character is locked: the two-step lock
/// transition writes `expire_at` first, so readers treat its presence alone
/// as the lock signal even if `locked_at` never landed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Character {
    pub id: String,
    pub player_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub region: String,
    pub class_type: String,
    pub species_id: i64,
    pub species_name: String,
    pub nickname: String,
    pub ability_id: String,
    pub nature: String,
    pub gender: String,
    pub locked_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    pub fn is_locked(&self) -> bool {
        self.expire_at.is_some()
    }

    pub fn starter(&self) -> StarterPokemon {
        StarterPokemon {
            species_id: self.species_id,
            species_name: self.species_name.clone(),
            nickname: self.nickname.clone(),
            ability_id: self.ability_id.clone(),
            nature: self.nature.clone(),
            gender: self.gender.clone(),
        }
    }
}

/// Fields for a new character. Lock fields are never set at creation.
#[derive(Debug, Clone)]
pub struct NewCharacter {
    pub name: String,
    pub avatar_url: Option<String>,
    pub region: String,
    pub class_type: String,
    pub starter: StarterPokemon,
}

/// Partial character update. `None` keeps the stored value; lock fields are
/// one-way and can only be set, never cleared.
#[derive(Debug, Clone, Default)]
pub struct CharacterChanges {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub region: Option<String>,
    pub class_type: Option<String>,
    pub starter: Option<StarterPokemon>,
    pub locked_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
}

/// One password-reset attempt: a short-lived code, then a short-lived token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordReset {
    pub id: String,
    pub player_id: String,
    pub email: String,
    pub code: String,
    pub code_expires_at: DateTime<Utc>,
    pub reset_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// RFC 3339 with fixed precision so lexicographic order matches time order.
fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// -----------------------------------------------------------------------------
// Database
// -----------------------------------------------------------------------------

impl Database {
    /// Create a new database connection pool.
    pub async fn new(url: &str) -> Result<Self, sqlx::Error> {
        // Add create_if_missing option for SQLite
        let url_with_options = if url.starts_with("sqlite:") && !url.contains('?') {
            format!("{}?mode=rwc", url)
        } else if url.starts_with("sqlite:") && !url.contains("mode=") {
            format!("{}&mode=rwc", url)
        } else {
            url.to_string()
        };

        // An in-memory SQLite database exists per connection; a single
        // connection keeps every handle on the same database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url_with_options)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        // Players table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS players (
                id TEXT PRIMARY KEY,
                player_type TEXT NOT NULL DEFAULT 'FREE',
                display_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                dob TEXT NOT NULL,
                national_id TEXT NOT NULL,
                selected_character_id TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Characters table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS characters (
                id TEXT PRIMARY KEY,
                player_id TEXT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                avatar_url TEXT,
                region TEXT NOT NULL,
                class_type TEXT NOT NULL,
                species_id INTEGER NOT NULL,
                species_name TEXT NOT NULL,
                nickname TEXT NOT NULL,
                ability_id TEXT NOT NULL,
                nature TEXT NOT NULL,
                gender TEXT NOT NULL,
                locked_at TEXT,
                expire_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Password resets table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS password_resets (
                id TEXT PRIMARY KEY,
                player_id TEXT NOT NULL REFERENCES players(id) ON DELETE CASCADE,
                email TEXT NOT NULL,
                code TEXT NOT NULL,
                code_expires_at TEXT NOT NULL,
                reset_token TEXT,
                token_expires_at TEXT,
                used INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes for performance
        let _ = sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_characters_player ON characters(player_id, created_at)",
        )
        .execute(&self.pool)
        .await;
        let _ = sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_password_resets_email ON password_resets(email, created_at)",
        )
        .execute(&self.pool)
        .await;

        tracing::info!("Database migrations complete");
        Ok(())
    }

    // =========================================================================
    // Player Methods
    // =========================================================================

    /// Find player by ID.
    pub async fn find_player_by_id(&self, id: &str) -> Result<Option<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>("SELECT * FROM players WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find player by email.
    pub async fn find_player_by_email(&self, email: &str) -> Result<Option<Player>, sqlx::Error> {
        sqlx::query_as::<_, Player>("SELECT * FROM players WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Create a new player profile (FREE tier by default).
    #[allow(clippy::too_many_arguments)]
    pub async fn create_player(
        &self,
        id: &str,
        display_name: &str,
        email: &str,
        password_hash: &str,
        dob: &str,
        national_id: &str,
    ) -> Result<Player, sqlx::Error> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO players (id, player_type, display_name, email, password_hash, dob, national_id, created_at, updated_at)
            VALUES (?, 'FREE', ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(display_name)
        .bind(email)
        .bind(password_hash)
        .bind(dob)
        .bind(national_id)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await?;

        self.find_player_by_id(id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Update a player's entitlement tier.
    pub async fn set_player_type(
        &self,
        id: &str,
        player_type: PlayerType,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE players SET player_type = ?, updated_at = ? WHERE id = ?")
            .bind(player_type.key())
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Persist which character the player selected (or clear it).
    pub async fn set_selected_character(
        &self,
        id: &str,
        character_id: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE players SET selected_character_id = ?, updated_at = ? WHERE id = ?")
            .bind(character_id)
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Replace a player's password hash.
    pub async fn update_player_password(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE players SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(ts(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // =========================================================================
    // Character Methods
    // =========================================================================

    /// Create a character and return the stored row.
    pub async fn create_character(
        &self,
        player_id: &str,
        input: &NewCharacter,
    ) -> Result<Character, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO characters (
                id, player_id, name, avatar_url, region, class_type,
                species_id, species_name, nickname, ability_id, nature, gender,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(player_id)
        .bind(&input.name)
        .bind(&input.avatar_url)
        .bind(&input.region)
        .bind(&input.class_type)
        .bind(input.starter.species_id)
        .bind(&input.starter.species_name)
        .bind(&input.starter.nickname)
        .bind(&input.starter.ability_id)
        .bind(&input.starter.nature)
        .bind(&input.starter.gender)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await?;

        self.get_character(player_id, &id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Fetch one character owned by the player.
    pub async fn get_character(
        &self,
        player_id: &str,
        character_id: &str,
    ) -> Result<Option<Character>, sqlx::Error> {
        sqlx::query_as::<_, Character>(
            "SELECT * FROM characters WHERE player_id = ? AND id = ?",
        )
        .bind(player_id)
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Full ordered snapshot of a player's characters, creation time
    /// ascending.
    pub async fn list_characters(&self, player_id: &str) -> Result<Vec<Character>, sqlx::Error> {
        sqlx::query_as::<_, Character>(
            "SELECT * FROM characters WHERE player_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(player_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Partial merge update. Always refreshes `updated_at`. A stored
    /// `expire_at` is never moved earlier.
    pub async fn update_character(
        &self,
        player_id: &str,
        character_id: &str,
        changes: &CharacterChanges,
    ) -> Result<Character, sqlx::Error> {
        let existing = self
            .get_character(player_id, character_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        let starter = changes
            .starter
            .clone()
            .unwrap_or_else(|| existing.starter());

        let expire_at = match (existing.expire_at, changes.expire_at) {
            (Some(current), Some(incoming)) => Some(current.max(incoming)),
            (Some(current), None) => Some(current),
            (None, incoming) => incoming,
        };
        let locked_at = changes.locked_at.or(existing.locked_at);

        sqlx::query(
            r#"
            UPDATE characters SET
                name = ?, avatar_url = ?, region = ?, class_type = ?,
                species_id = ?, species_name = ?, nickname = ?,
                ability_id = ?, nature = ?, gender = ?,
                locked_at = ?, expire_at = ?, updated_at = ?
            WHERE player_id = ? AND id = ?
            "#,
        )
        .bind(changes.name.as_ref().unwrap_or(&existing.name))
        .bind(changes.avatar_url.as_ref().or(existing.avatar_url.as_ref()))
        .bind(changes.region.as_ref().unwrap_or(&existing.region))
        .bind(changes.class_type.as_ref().unwrap_or(&existing.class_type))
        .bind(starter.species_id)
        .bind(&starter.species_name)
        .bind(&starter.nickname)
        .bind(&starter.ability_id)
        .bind(&starter.nature)
        .bind(&starter.gender)
        .bind(locked_at.map(ts))
        .bind(expire_at.map(ts))
        .bind(ts(Utc::now()))
        .bind(player_id)
        .bind(character_id)
        .execute(&self.pool)
        .await?;

        self.get_character(player_id, character_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Hard delete. Returns whether a row was removed.
    pub async fn delete_character(
        &self,
        player_id: &str,
        character_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM characters WHERE player_id = ? AND id = ?")
            .bind(player_id)
            .bind(character_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Password Reset Methods
    // =========================================================================

    /// Record a freshly issued reset code.
    pub async fn insert_reset_code(
        &self,
        player_id: &str,
        email: &str,
        code: &str,
        code_expires_at: DateTime<Utc>,
    ) -> Result<PasswordReset, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO password_resets (id, player_id, email, code, code_expires_at, used, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(player_id)
        .bind(email)
        .bind(code)
        .bind(ts(code_expires_at))
        .bind(ts(now))
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, PasswordReset>("SELECT * FROM password_resets WHERE id = ?")
            .bind(&id)
            .fetch_one(&self.pool)
            .await
    }

    /// Latest reset attempt for an email, used or not.
    pub async fn latest_reset_for_email(
        &self,
        email: &str,
    ) -> Result<Option<PasswordReset>, sqlx::Error> {
        sqlx::query_as::<_, PasswordReset>(
            "SELECT * FROM password_resets WHERE email = ? ORDER BY created_at DESC LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Attach the short-lived reset token after code verification.
    pub async fn attach_reset_token(
        &self,
        id: &str,
        reset_token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE password_resets SET reset_token = ?, token_expires_at = ? WHERE id = ?",
        )
        .bind(reset_token)
        .bind(ts(token_expires_at))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find an unused reset attempt by (email, token).
    pub async fn find_reset_by_token(
        &self,
        email: &str,
        reset_token: &str,
    ) -> Result<Option<PasswordReset>, sqlx::Error> {
        sqlx::query_as::<_, PasswordReset>(
            "SELECT * FROM password_resets WHERE email = ? AND reset_token = ? AND used = 0",
        )
        .bind(email)
        .bind(reset_token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a reset attempt consumed.
    pub async fn consume_reset(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub(crate) async fn memory_db() -> Database {
        let db = Database::new("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    pub(crate) async fn seed_player(db: &Database, email: &str) -> Player {
        let id = uuid::Uuid::new_v4().to_string();
        db.create_player(&id, "Red", email, "hash", "01/01/1990", "52998224725")
            .await
            .unwrap()
    }

    pub(crate) fn starter_fixture() -> StarterPokemon {
        StarterPokemon {
            species_id: 1,
            species_name: "Bulbasaur".into(),
            nickname: "Bulbasaur".into(),
            ability_id: "overgrow".into(),
            nature: "Docile".into(),
            gender: "M".into(),
        }
    }

    pub(crate) fn new_character(name: &str) -> NewCharacter {
        NewCharacter {
            name: name.into(),
            avatar_url: None,
            region: "KANTO".into(),
            class_type: "TRAINER".into(),
            starter: starter_fixture(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn player_roundtrip_and_tier_change() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        assert_eq!(player.player_type(), PlayerType::Free);

        db.set_player_type(&player.id, PlayerType::Vip).await.unwrap();
        let reloaded = db.find_player_by_id(&player.id).await.unwrap().unwrap();
        assert_eq!(reloaded.player_type(), PlayerType::Vip);

        let by_email = db
            .find_player_by_email("red@pallet.town")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, player.id);
    }

    #[tokio::test]
    async fn characters_list_in_creation_order() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;

        let first = db
            .create_character(&player.id, &new_character("First"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = db
            .create_character(&player.id, &new_character("Second"))
            .await
            .unwrap();

        let chars = db.list_characters(&player.id).await.unwrap();
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[0].id, first.id);
        assert_eq!(chars[1].id, second.id);
        assert!(chars[0].expire_at.is_none());
        assert!(!chars[0].is_locked());
    }

    #[tokio::test]
    async fn partial_update_merges_and_bumps_updated_at() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        let created = db
            .create_character(&player.id, &new_character("Red"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let changes = CharacterChanges {
            name: Some("Crimson".into()),
            ..Default::default()
        };
        let updated = db
            .update_character(&player.id, &created.id, &changes)
            .await
            .unwrap();

        assert_eq!(updated.name, "Crimson");
        assert_eq!(updated.region, "KANTO");
        assert_eq!(updated.species_name, "Bulbasaur");
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn expire_at_never_moves_earlier() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        let created = db
            .create_character(&player.id, &new_character("Red"))
            .await
            .unwrap();

        let later = Utc::now() + chrono::Duration::days(45);
        let earlier = Utc::now() + chrono::Duration::days(1);

        db.update_character(
            &player.id,
            &created.id,
            &CharacterChanges {
                expire_at: Some(later),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let after = db
            .update_character(
                &player.id,
                &created.id,
                &CharacterChanges {
                    expire_at: Some(earlier),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = after.expire_at.unwrap();
        assert!((stored - later).num_seconds().abs() < 1);
    }

    #[tokio::test]
    async fn update_of_missing_character_is_row_not_found() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;

        let err = db
            .update_character(&player.id, "nope", &CharacterChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn delete_is_hard_and_scoped_to_owner() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        let other = seed_player(&db, "blue@pallet.town").await;
        let created = db
            .create_character(&player.id, &new_character("Red"))
            .await
            .unwrap();

        // another player cannot delete it
        assert!(!db.delete_character(&other.id, &created.id).await.unwrap());
        assert!(db.delete_character(&player.id, &created.id).await.unwrap());
        assert!(db
            .get_character(&player.id, &created.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reset_code_lifecycle() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;

        let reset = db
            .insert_reset_code(
                &player.id,
                &player.email,
                "123456",
                Utc::now() + chrono::Duration::minutes(15),
            )
            .await
            .unwrap();
        assert!(!reset.used);

        let latest = db
            .latest_reset_for_email(&player.email)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, reset.id);

        db.attach_reset_token(&reset.id, "token", Utc::now() + chrono::Duration::minutes(15))
            .await
            .unwrap();
        let by_token = db
            .find_reset_by_token(&player.email, "token")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_token.id, reset.id);

        db.consume_reset(&reset.id).await.unwrap();
        assert!(db
            .find_reset_by_token(&player.email, "token")
            .await
            .unwrap()
            .is_none());
    }
}
