//! Shared, cross-player registries: chest locks and known bot names.
//!
//! Both are collaborator interfaces per the spec (the host may back them
//! with whatever persistent store it likes); this module also ships one
//! reference implementation of each so the crate is runnable end-to-end.

pub mod bots;
pub mod chest;

pub use bots::{BotRegistry, InMemoryBotRegistry};
pub use chest::{ChestLock, ChestRegistry, Coordinate, JsonFileChestRegistry};
