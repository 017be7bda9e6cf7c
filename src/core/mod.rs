//! Core deterministic primitives.
//!
//! Identifiers, state hashing and seed derivation. Nothing in here touches
//! the clock, the filesystem or a runtime RNG.

pub mod hash;
pub mod ids;
pub mod seed;

// Re-export core types
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use ids::{CharacterId, GameId, LocationId, ObstacleId, PathId, PlayerId};
pub use seed::derive_game_seed;
