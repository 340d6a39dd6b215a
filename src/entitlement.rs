// =============================================================================
// EloDex Backend - Entitlement Downgrade Rule
// =============================================================================
// A FREE player keeps only the earliest-created character unlocked. Every
// later character is transitioned ACTIVE -> LOCKED exactly once:
//   1. expire_at = now + 45 days
//   2. locked_at = now
// as two sequential partial updates. The transition is one-way; there is no
// unlock when a player returns to VIP.
// =============================================================================

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use crate::db::{Character, CharacterChanges, Database, PlayerType};
use crate::error::AppError;
use crate::feed::{CharacterFeed, Subscription};

/// Grace period before a locked character becomes eligible for the external
/// reaper.
pub const DOWNGRADE_GRACE_DAYS: i64 = 45;

/// Character quota per tier.
pub fn max_characters(player_type: PlayerType) -> usize {
    match player_type {
        PlayerType::Free => 1,
        PlayerType::Vip => 3,
    }
}

/// Pure planning step: which characters of this snapshot need locking.
///
/// Characters are expected in creation order ascending. Position 0 is never
/// locked; characters that already carry `expire_at` are never re-processed.
pub fn plan_lockdown(player_type: PlayerType, characters: &[Character]) -> Vec<String> {
    if player_type != PlayerType::Free {
        return Vec::new();
    }

    characters
        .iter()
        .skip(1)
        .filter(|c| c.expire_at.is_none())
        .map(|c| c.id.clone())
        .collect()
}

/// Applies the downgrade rule against the store.
///
/// The in-memory guard set suppresses re-entrant lock attempts for a
/// character id while its update is in flight; near-simultaneous snapshot
/// notifications therefore never double-process a character.
pub struct Enforcer {
    db: Database,
    locking: Mutex<HashSet<String>>,
}

impl Enforcer {
    pub fn new(db: Database) -> Arc<Self> {
        Arc::new(Self {
            db,
            locking: Mutex::new(HashSet::new()),
        })
    }

    /// Re-evaluate the rule for one player.
    pub async fn enforce(&self, player_id: &str) -> Result<(), AppError> {
        let Some(player) = self.db.find_player_by_id(player_id).await? else {
            return Ok(());
        };
        if player.player_type() != PlayerType::Free {
            return Ok(());
        }

        let characters = self.db.list_characters(player_id).await?;

        for character_id in plan_lockdown(PlayerType::Free, &characters) {
            let Some(guard) = self.begin(&character_id) else {
                continue;
            };

            if let Err(e) = self.lock_character(player_id, &character_id).await {
                tracing::warn!(
                    player_id,
                    character_id,
                    error = %e,
                    "failed to lock character on downgrade"
                );
            }

            drop(guard);
        }

        Ok(())
    }

    /// Two-step lock transition. Not atomic: a crash after the first write
    /// leaves `expire_at` set and `locked_at` unset, which readers already
    /// treat as locked.
    async fn lock_character(&self, player_id: &str, character_id: &str) -> Result<(), AppError> {
        let now = Utc::now();

        self.db
            .update_character(
                player_id,
                character_id,
                &CharacterChanges {
                    expire_at: Some(now + Duration::days(DOWNGRADE_GRACE_DAYS)),
                    ..Default::default()
                },
            )
            .await?;

        self.db
            .update_character(
                player_id,
                character_id,
                &CharacterChanges {
                    locked_at: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(player_id, character_id, "character locked by downgrade rule");
        Ok(())
    }

    /// Claim a character id for locking. `None` if an update for the same id
    /// is already in flight.
    fn begin(&self, character_id: &str) -> Option<InFlight<'_>> {
        let mut locking = self.locking.lock().expect("guard set poisoned");
        if !locking.insert(character_id.to_string()) {
            return None;
        }
        Some(InFlight {
            enforcer: self,
            character_id: character_id.to_string(),
        })
    }
}

/// Releases the guard entry on success and failure alike.
struct InFlight<'a> {
    enforcer: &'a Enforcer,
    character_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut locking) = self.enforcer.locking.lock() {
            locking.remove(&self.character_id);
        }
    }
}

/// Wire the enforcer to the character feed: every published snapshot
/// re-evaluates the rule for that player. Keep the returned handle alive for
/// the lifetime of the server.
pub fn attach(enforcer: Arc<Enforcer>, feed: &CharacterFeed) -> Subscription {
    feed.subscribe_all(move |player_id, _snapshot| {
        let enforcer = Arc::clone(&enforcer);
        let player_id = player_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = enforcer.enforce(&player_id).await {
                tracing::warn!(player_id, error = %e, "downgrade rule pass failed");
            }
        });
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::{memory_db, new_character, seed_player};
    use std::time::Duration as StdDuration;

    async fn seed_characters(db: &Database, player_id: &str, count: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for i in 0..count {
            let c = db
                .create_character(player_id, &new_character(&format!("Char {i}")))
                .await
                .unwrap();
            ids.push(c.id);
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        ids
    }

    #[tokio::test]
    async fn free_pass_locks_everything_after_position_zero() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        let ids = seed_characters(&db, &player.id, 3).await;

        let enforcer = Enforcer::new(db.clone());
        enforcer.enforce(&player.id).await.unwrap();

        let chars = db.list_characters(&player.id).await.unwrap();
        assert_eq!(chars[0].id, ids[0]);
        assert!(chars[0].expire_at.is_none());
        assert!(chars[0].locked_at.is_none());

        for c in &chars[1..] {
            let expire = c.expire_at.expect("extra characters must expire");
            assert!(c.locked_at.is_some());
            assert!(c.is_locked());

            let days = (expire - Utc::now()).num_days();
            assert!((44..=45).contains(&days), "expire_at ~45 days out, got {days}");
        }
    }

    #[tokio::test]
    async fn second_pass_is_idempotent() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        seed_characters(&db, &player.id, 2).await;

        let enforcer = Enforcer::new(db.clone());
        enforcer.enforce(&player.id).await.unwrap();
        let after_first = db.list_characters(&player.id).await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(5)).await;
        enforcer.enforce(&player.id).await.unwrap();
        let after_second = db.list_characters(&player.id).await.unwrap();

        // no additional writes: timestamps unchanged
        for (a, b) in after_first.iter().zip(after_second.iter()) {
            assert_eq!(a.expire_at, b.expire_at);
            assert_eq!(a.locked_at, b.locked_at);
            assert_eq!(a.updated_at, b.updated_at);
        }
    }

    #[tokio::test]
    async fn vip_players_are_never_processed() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        db.set_player_type(&player.id, PlayerType::Vip).await.unwrap();
        seed_characters(&db, &player.id, 3).await;

        let enforcer = Enforcer::new(db.clone());
        enforcer.enforce(&player.id).await.unwrap();

        let chars = db.list_characters(&player.id).await.unwrap();
        assert!(chars.iter().all(|c| c.expire_at.is_none()));
    }

    #[tokio::test]
    async fn relocking_does_not_shorten_the_grace_period() {
        let db = memory_db().await;
        let player = seed_player(&db, "red@pallet.town").await;
        let ids = seed_characters(&db, &player.id, 2).await;

        // already locked with a later expiry than a fresh pass would set
        let far_out = Utc::now() + chrono::Duration::days(90);
        db.update_character(
            &player.id,
            &ids[1],
            &CharacterChanges {
                expire_at: Some(far_out),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let enforcer = Enforcer::new(db.clone());
        enforcer.enforce(&player.id).await.unwrap();

        let chars = db.list_characters(&player.id).await.unwrap();
        let stored = chars[1].expire_at.unwrap();
        assert!((stored - far_out).num_seconds().abs() < 1);
    }

    #[test]
    fn plan_skips_position_zero_and_locked_characters() {
        use crate::db::test_util::starter_fixture;
        use crate::db::Character;

        let now = Utc::now();
        let make = |id: &str, expire_at| {
            let starter = starter_fixture();
            Character {
                id: id.into(),
                player_id: "p".into(),
                name: id.into(),
                avatar_url: None,
                region: "KANTO".into(),
                class_type: "TRAINER".into(),
                species_id: starter.species_id,
                species_name: starter.species_name,
                nickname: starter.nickname,
                ability_id: starter.ability_id,
                nature: starter.nature,
                gender: starter.gender,
                locked_at: None,
                expire_at,
                created_at: now,
                updated_at: now,
            }
        };

        let chars = vec![
            make("a", None),
            make("b", Some(now)),
            make("c", None),
        ];

        assert_eq!(plan_lockdown(PlayerType::Free, &chars), vec!["c".to_string()]);
        assert!(plan_lockdown(PlayerType::Vip, &chars).is_empty());
        assert!(plan_lockdown(PlayerType::Free, &[]).is_empty());
        assert!(plan_lockdown(PlayerType::Free, &chars[..1]).is_empty());
    }

    #[tokio::test]
    async fn guard_set_suppresses_reentrant_lock_attempts() {
        let db = memory_db().await;
        let enforcer = Enforcer::new(db);

        let first = enforcer.begin("char-1");
        assert!(first.is_some());
        assert!(enforcer.begin("char-1").is_none());
        assert!(enforcer.begin("char-2").is_some());

        drop(first);
        assert!(enforcer.begin("char-1").is_some());
    }
}
