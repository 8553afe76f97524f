//! The chest registry: a persistent map from world coordinate to an
//! optional lock. Out of scope per the distilled spec as a concrete
//! store, but required as a trait so the policy hooks in
//! [`crate::policy`] have something to call; [`JsonFileChestRegistry`]
//! is the reference implementation used by the tests and the example
//! binary.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A block coordinate. Ordering and hashing are by value, matching the
/// "each coordinate appears at most once" invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl Coordinate {
    /// Construct a coordinate.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The six axis-aligned neighbors, used to find an adjacent chest
    /// for double-chest lock inheritance.
    pub fn adjacent(&self) -> [Coordinate; 6] {
        [
            Coordinate::new(self.x + 1, self.y, self.z),
            Coordinate::new(self.x - 1, self.y, self.z),
            Coordinate::new(self.x, self.y + 1, self.z),
            Coordinate::new(self.x, self.y - 1, self.z),
            Coordinate::new(self.x, self.y, self.z + 1),
            Coordinate::new(self.x, self.y, self.z - 1),
        ]
    }
}

/// The lock state of one registered chest coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestLock {
    /// Lock owner's player name; `None` means the chest is registered
    /// but open (unlocked).
    pub owner: Option<String>,
    /// Display name shown in the chest's open-window title.
    pub display_name: Option<String>,
}

impl ChestLock {
    /// A registered-but-open chest.
    pub fn open() -> Self {
        Self { owner: None, display_name: None }
    }

    /// A chest locked to `owner`.
    pub fn locked(owner: impl Into<String>, display_name: Option<String>) -> Self {
        Self { owner: Some(owner.into()), display_name }
    }

    /// True if this chest is currently locked to someone.
    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Persistent registry of chest coordinates to their lock state.
#[async_trait]
pub trait ChestRegistry: Send + Sync {
    /// True if `coord` is registered and locked.
    async fn is_locked(&self, coord: Coordinate) -> bool;

    /// True if `player` may open the chest at `coord`: either it isn't
    /// locked, or it's locked to `player`.
    async fn can_open(&self, player: &str, coord: Coordinate) -> bool;

    /// Find an adjacent registered chest, if any (for double-chest lock
    /// inheritance).
    async fn adjacent(&self, coord: Coordinate) -> Option<(Coordinate, ChestLock)>;

    /// The current lock entry for `coord`, if registered.
    async fn get(&self, coord: Coordinate) -> Option<ChestLock>;

    /// Register `coord` as open (no owner).
    async fn add_open(&self, coord: Coordinate) -> Result<()>;

    /// Grant a lock on `coord` to `owner`, with an optional display name.
    async fn give_lock(&self, coord: Coordinate, owner: &str, display_name: Option<String>) -> Result<()>;

    /// Clear a coordinate's lock, leaving it registered as open.
    async fn release(&self, coord: Coordinate) -> Result<()>;

    /// Remove a coordinate from the registry entirely.
    async fn unlock(&self, coord: Coordinate) -> Result<()>;

    /// Rename a registered chest's display name.
    async fn rename(&self, coord: Coordinate, name: Option<String>) -> Result<()>;
}

struct Inner {
    chests: HashMap<Coordinate, ChestLock>,
    path: Option<PathBuf>,
}

impl Inner {
    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.chests)
            .map_err(|err| crate::error::TunnelError::Persistence(err.to_string()))?;
        std::fs::write(path, json)
            .map_err(|err| crate::error::TunnelError::Persistence(format!("{}: {err}", path.display())))
    }
}

/// A [`ChestRegistry`] backed by an in-memory map that is serialized to a
/// JSON file on every mutation (the spec requires persistence "flushed at
/// every transition").
pub struct JsonFileChestRegistry {
    inner: Mutex<Inner>,
}

impl JsonFileChestRegistry {
    /// An empty, in-memory-only registry (no file backing).
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(Inner { chests: HashMap::new(), path: None }),
        }
    }

    /// A registry backed by a JSON file, loading existing state if the
    /// file exists.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let chests = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        Self {
            inner: Mutex::new(Inner { chests, path: Some(path) }),
        }
    }
}

#[async_trait]
impl ChestRegistry for JsonFileChestRegistry {
    async fn is_locked(&self, coord: Coordinate) -> bool {
        self.inner
            .lock()
            .unwrap()
            .chests
            .get(&coord)
            .map(ChestLock::is_locked)
            .unwrap_or(false)
    }

    async fn can_open(&self, player: &str, coord: Coordinate) -> bool {
        match self.inner.lock().unwrap().chests.get(&coord) {
            None => true,
            Some(lock) => match &lock.owner {
                None => true,
                Some(owner) => owner == player,
            },
        }
    }

    async fn adjacent(&self, coord: Coordinate) -> Option<(Coordinate, ChestLock)> {
        let inner = self.inner.lock().unwrap();
        coord
            .adjacent()
            .into_iter()
            .find_map(|candidate| inner.chests.get(&candidate).map(|lock| (candidate, lock.clone())))
    }

    async fn get(&self, coord: Coordinate) -> Option<ChestLock> {
        self.inner.lock().unwrap().chests.get(&coord).cloned()
    }

    async fn add_open(&self, coord: Coordinate) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.chests.insert(coord, ChestLock::open());
        inner.persist()
    }

    async fn give_lock(&self, coord: Coordinate, owner: &str, display_name: Option<String>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.chests.insert(coord, ChestLock::locked(owner, display_name));
        inner.persist()
    }

    async fn release(&self, coord: Coordinate) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.chests.insert(coord, ChestLock::open());
        inner.persist()
    }

    async fn unlock(&self, coord: Coordinate) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.chests.remove(&coord);
        inner.persist()
    }

    async fn rename(&self, coord: Coordinate, name: Option<String>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(lock) = inner.chests.get_mut(&coord) {
            lock.display_name = name;
        }
        inner.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adjacent_lock_is_discoverable() {
        let registry = JsonFileChestRegistry::in_memory();
        let owned = Coordinate::new(0, 64, 0);
        registry.give_lock(owned, "alice", Some("Alice's Chest".into())).await.unwrap();

        let neighbor = Coordinate::new(1, 64, 0);
        let (found_at, lock) = registry.adjacent(neighbor).await.unwrap();
        assert_eq!(found_at, owned);
        assert_eq!(lock.owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn can_open_respects_ownership() {
        let registry = JsonFileChestRegistry::in_memory();
        let coord = Coordinate::new(5, 5, 5);
        registry.give_lock(coord, "bob", None).await.unwrap();

        assert!(registry.can_open("bob", coord).await);
        assert!(!registry.can_open("mallory", coord).await);
        assert!(registry.can_open("anyone", Coordinate::new(9, 9, 9)).await);
    }

    #[tokio::test]
    async fn unlock_removes_registration_entirely() {
        let registry = JsonFileChestRegistry::in_memory();
        let coord = Coordinate::new(1, 1, 1);
        registry.add_open(coord).await.unwrap();
        assert!(registry.get(coord).await.is_some());
        registry.unlock(coord).await.unwrap();
        assert!(registry.get(coord).await.is_none());
    }
}
