//! Action Partitioning
//!
//! Splits the action vocabulary across the connected players. The split is a
//! hand-tuned table keyed by player count; assignment rotates the roster by
//! the game's random seed before handing out the sets.

use serde::{Deserialize, Serialize};

use crate::core::ids::PlayerId;

/// Room cap: the largest player count the table covers.
pub const MAX_PLAYERS: usize = 8;

/// A control that can be delegated to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ActionName {
    /// Move west
    MoveWest = 0,
    /// Move east
    MoveEast = 1,
    /// Move north
    MoveNorth = 2,
    /// Move south
    MoveSouth = 3,
    /// Take a portal
    UsePortal = 4,
    /// Clear an obstacle
    ClearObstacle = 5,
    /// Reserved
    Teleport = 6,
    /// Reserved
    Disarm = 7,
    /// Reserved
    Smash = 8,
    /// Reserved
    Heal = 9,
}

/// The full action vocabulary, in declaration order.
pub const VOCABULARY: [ActionName; 10] = [
    ActionName::MoveWest,
    ActionName::MoveEast,
    ActionName::MoveNorth,
    ActionName::MoveSouth,
    ActionName::UsePortal,
    ActionName::ClearObstacle,
    ActionName::Teleport,
    ActionName::Disarm,
    ActionName::Smash,
    ActionName::Heal,
];

/// Action sets for `player_count` players.
///
/// Empty for 0 or more than [`MAX_PLAYERS`]. From five players upward some
/// movement directions are deliberately handed to more than one player.
pub fn action_sets(player_count: usize) -> Vec<Vec<ActionName>> {
    use ActionName::*;

    let table: &[&[ActionName]] = match player_count {
        1 => &[&VOCABULARY],
        2 => &[
            &[MoveWest, MoveSouth, UsePortal, ClearObstacle, Smash],
            &[MoveEast, MoveNorth, Teleport, Disarm, Heal],
        ],
        3 => &[
            &[MoveWest, Teleport, Disarm],
            &[MoveEast, MoveNorth, Smash, Heal],
            &[MoveSouth, UsePortal, ClearObstacle],
        ],
        4 => &[
            &[MoveWest, Teleport, Disarm],
            &[MoveEast, Smash],
            &[MoveNorth, ClearObstacle, Heal],
            &[MoveSouth, UsePortal],
        ],
        5 => &[
            &[MoveWest, Teleport],
            &[MoveEast, Smash],
            &[MoveNorth, ClearObstacle, Heal],
            &[MoveWest, Disarm],
            &[MoveSouth, UsePortal],
        ],
        6 => &[
            &[MoveWest, Teleport],
            &[MoveEast, Smash],
            &[MoveNorth, Heal],
            &[MoveWest, Disarm],
            &[MoveEast, ClearObstacle],
            &[MoveSouth, UsePortal],
        ],
        7 => &[
            &[MoveWest, Teleport],
            &[MoveEast, Smash],
            &[MoveNorth, Heal],
            &[MoveWest, Disarm],
            &[MoveEast, ClearObstacle],
            &[MoveNorth, Teleport],
            &[MoveSouth, UsePortal],
        ],
        8 => &[
            &[MoveWest, Teleport],
            &[MoveEast, Smash],
            &[MoveNorth, Heal],
            &[MoveSouth, UsePortal],
            &[MoveWest, Disarm],
            &[MoveEast, ClearObstacle],
            &[MoveNorth, Teleport],
            &[MoveSouth, Smash],
        ],
        _ => &[],
    };

    table.iter().map(|set| set.to_vec()).collect()
}

/// Pair each set with a player.
///
/// The roster is rotated left by `seed mod len` and then zipped with `sets`;
/// the k-th set goes to the k-th rotated player.
pub fn assign(
    sets: Vec<Vec<ActionName>>,
    players: &[PlayerId],
    seed: u32,
) -> Vec<(PlayerId, Vec<ActionName>)> {
    if players.is_empty() {
        return Vec::new();
    }

    let offset = seed as usize % players.len();
    players[offset..]
        .iter()
        .chain(&players[..offset])
        .copied()
        .zip(sets)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
