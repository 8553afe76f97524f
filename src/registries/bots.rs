//! The bot registry: a shared set of player names treated as
//! non-players for filtering purposes (named-entity-spawn suppression,
//! join/leave chat suppression, etc).

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

/// Read-side interface the policy hooks need to decide whether a name
/// belongs to a known bot.
#[async_trait]
pub trait BotRegistry: Send + Sync {
    /// True if `name` is a registered bot.
    async fn is_bot(&self, name: &str) -> bool;
}

/// An in-memory, process-shared set of bot names.
pub struct InMemoryBotRegistry {
    names: RwLock<HashSet<String>>,
}

impl InMemoryBotRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { names: RwLock::new(HashSet::new()) }
    }

    /// A registry pre-populated with `names`.
    pub fn with_names(names: impl IntoIterator<Item = String>) -> Self {
        Self { names: RwLock::new(names.into_iter().collect()) }
    }

    /// Register a bot name.
    pub fn add(&self, name: impl Into<String>) {
        self.names.write().unwrap().insert(name.into());
    }

    /// Unregister a bot name.
    pub fn remove(&self, name: &str) {
        self.names.write().unwrap().remove(name);
    }
}

impl Default for InMemoryBotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BotRegistry for InMemoryBotRegistry {
    async fn is_bot(&self, name: &str) -> bool {
        self.names.read().unwrap().contains(name)
    }
}
