// =============================================================================
// EloDex Backend - Character List Feed
// =============================================================================
// Push-based observation of a player's character list. Every mutation
// publishes a full ordered snapshot; there are no delta semantics.
// Subscribers get an explicit unsubscribe handle (also released on drop).
// =============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use crate::db::Character;

type Callback = Arc<dyn Fn(&str, &[Character]) + Send + Sync>;

struct Subscriber {
    /// `None` observes every player (used by the entitlement enforcer).
    player_id: Option<String>,
    callback: Callback,
}

#[derive(Default)]
struct FeedInner {
    next_id: u64,
    subscribers: HashMap<u64, Subscriber>,
}

/// Registry of character-list observers.
#[derive(Clone, Default)]
pub struct CharacterFeed {
    inner: Arc<Mutex<FeedInner>>,
}

impl CharacterFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one player's list.
    pub fn subscribe<F>(&self, player_id: &str, callback: F) -> Subscription
    where
        F: Fn(&str, &[Character]) + Send + Sync + 'static,
    {
        self.register(Some(player_id.to_string()), Arc::new(callback))
    }

    /// Observe every player's list.
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str, &[Character]) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(callback))
    }

    fn register(&self, player_id: Option<String>, callback: Callback) -> Subscription {
        let mut inner = self.inner.lock().expect("feed lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(
            id,
            Subscriber {
                player_id,
                callback,
            },
        );

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver a full snapshot to every matching subscriber. Callbacks run
    /// outside the registry lock.
    pub fn publish(&self, player_id: &str, snapshot: &[Character]) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.lock().expect("feed lock poisoned");
            inner
                .subscribers
                .values()
                .filter(|s| s.player_id.as_deref().map_or(true, |p| p == player_id))
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };

        for callback in callbacks {
            callback(player_id, snapshot);
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("feed lock poisoned").subscribers.len()
    }
}

/// Handle returned by `subscribe`. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    inner: Weak<Mutex<FeedInner>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    fn remove(&self) {
        if let Some(inner) = self.inner.upgrade() {
            if let Ok(mut inner) = inner.lock() {
                inner.subscribers.remove(&self.id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

// =============================================================================
// Tests
// =============================================================================
