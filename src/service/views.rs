//! Read-Facing Projections
//!
//! What the command and query surface hands back to collaborators.

use serde::{Deserialize, Serialize};

use crate::core::ids::{CharacterId, GameId, LocationId};
use crate::game::events::ChangeSet;
use crate::game::movement::{available_actions, AvailableActions};
use crate::game::state::Game;
use crate::game::world::{Character, CharacterClass, World};

/// A character with everything it may do right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterView {
    /// Character identifier
    pub id: CharacterId,
    /// Role
    pub class: CharacterClass,
    /// Current location
    pub location: LocationId,
    /// Legal moves, portals and clearable obstacles
    pub actions: AvailableActions,
}

impl CharacterView {
    /// Project `character` against the current world.
    pub fn of(world: &World, character: &Character) -> Self {
        Self {
            id: character.id,
            class: character.class,
            location: character.location,
            actions: available_actions(world, character.id).unwrap_or_default(),
        }
    }
}

/// Summary of one game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game identifier
    pub id: GameId,
    /// Originating world definition
    pub world: String,
    /// Stream version the summary reflects
    pub version: u64,
    /// Connected players
    pub players: usize,
    /// Characters in the world
    pub characters: usize,
    /// Hex state hash of the folded aggregate
    pub state_hash: String,
}

impl GameSummary {
    /// Summarize a folded game.
    pub fn of(game: &Game, version: u64) -> Self {
        Self {
            id: game.id(),
            world: game.world().name().unwrap_or_default().to_string(),
            version,
            players: game.player_count(),
            characters: game.world().characters().count(),
            state_hash: hex::encode(game.compute_hash()),
        }
    }
}

/// Change notification for the real-time channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldUpdated {
    /// Game that changed
    pub game_id: GameId,
    /// Stream version after the change
    pub version: u64,
    /// Resource categories to push
    pub resources: ChangeSet,
}

/// Result of a successful command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome<T> {
    /// Updated projection
    pub value: T,
    /// Stream version after the command
    pub version: u64,
    /// Resource categories changed
    pub changes: ChangeSet,
}
