//! Game Seed Derivation
//!
//! The random seed of a game is fixed once, at creation, and only ever used
//! to rotate action-set assignment. It is derived from the game id so that a
//! replayed history never depends on a runtime RNG.

use super::hash::StateHasher;
use super::ids::GameId;

/// Derive the random seed for a new game.
///
/// # Parameters
///
/// - `game_id`: Freshly generated game id (random UUID, unpredictable to players)
/// - `world_name`: Name of the world definition the game was created from
pub fn derive_game_seed(game_id: &GameId, world_name: &str) -> u32 {
    // Domain separator
    let mut hasher = StateHasher::new(b"MAZE_GAME_SEED_V1");
    hasher.update_uuid(game_id.as_bytes());
    hasher.update_str(world_name);

    let hash = hasher.finalize();

    let mut seed = [0u8; 4];
    seed.copy_from_slice(&hash[0..4]);
    u32::from_le_bytes(seed)
}
