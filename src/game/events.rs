//! Game Events
//!
//! The closed set of facts a game's history is made of, plus the bookkeeping
//! of which entities each fact touched (for change notification).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::ids::{CharacterId, LocationId, ObstacleId, PathId, PlayerId};
use crate::game::discovery::Revealed;
use crate::game::world::{Character, Location, Obstacle, Path};

/// A fact in a game's history.
///
/// Serialized adjacently tagged: `{"kind": "CharacterMoved", "payload": {...}}`.
/// The kind names are persisted and must never change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum GameEvent {
    /// Topology installed. Must be first.
    WorldLoaded {
        /// World definition name
        name: String,
        /// All locations
        locations: Vec<Location>,
        /// All paths
        paths: Vec<Path>,
        /// All obstacles
        obstacles: Vec<Obstacle>,
    },

    /// A character placed in the world.
    CharacterAdded {
        /// The character and its starting location
        character: Character,
    },

    /// A character moved to a resolved destination.
    CharacterMoved {
        /// Who moved
        character: CharacterId,
        /// Where it landed
        location: LocationId,
    },

    /// An obstacle was cleared.
    ObstacleRemoved {
        /// Cleared obstacle
        obstacle: ObstacleId,
    },

    /// A player connected. The id is assigned by the fold.
    PlayerJoined {
        /// Display name
        name: String,
    },

    /// A player disconnected.
    PlayerLeft {
        /// Departing player
        player: PlayerId,
    },

    /// Random seed fixed. Exactly once, before any player joins.
    RandomSeedSet {
        /// The seed
        seed: u32,
    },
}

impl GameEvent {
    /// Every persisted kind name.
    pub const KINDS: [&'static str; 7] = [
        "WorldLoaded",
        "CharacterAdded",
        "CharacterMoved",
        "ObstacleRemoved",
        "PlayerJoined",
        "PlayerLeft",
        "RandomSeedSet",
    ];

    /// Stable kind name used as the persisted tag.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::WorldLoaded { .. } => "WorldLoaded",
            GameEvent::CharacterAdded { .. } => "CharacterAdded",
            GameEvent::CharacterMoved { .. } => "CharacterMoved",
            GameEvent::ObstacleRemoved { .. } => "ObstacleRemoved",
            GameEvent::PlayerJoined { .. } => "PlayerJoined",
            GameEvent::PlayerLeft { .. } => "PlayerLeft",
            GameEvent::RandomSeedSet { .. } => "RandomSeedSet",
        }
    }
}

// =============================================================================
// CHANGE TRACKING
// =============================================================================

/// An entity touched by folding one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Touched {
    /// Player added, removed or re-assigned
    Player(PlayerId),
    /// Character added or moved
    Character(CharacterId),
    /// Location revealed
    Location(LocationId),
    /// Obstacle revealed or removed
    Obstacle(ObstacleId),
    /// Path revealed or unblocked
    Path(PathId),
}

impl From<Revealed> for Touched {
    fn from(revealed: Revealed) -> Self {
        match revealed {
            Revealed::Location(id) => Touched::Location(id),
            Revealed::Path(id) => Touched::Path(id),
            Revealed::Obstacle(id) => Touched::Obstacle(id),
        }
    }
}

/// Resource category pushed to subscribed clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Characters and their available actions
    Characters,
    /// Discovered locations
    Locations,
    /// Discovered paths
    Paths,
    /// Discovered obstacles
    Obstacles,
    /// Connected players
    Players,
}

impl ResourceKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Characters => "characters",
            ResourceKind::Locations => "locations",
            ResourceKind::Paths => "paths",
            ResourceKind::Obstacles => "obstacles",
            ResourceKind::Players => "players",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource categories changed by a command.
///
/// Characters are always included: available actions depend on the whole
/// world, not only on what moved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(BTreeSet<ResourceKind>);

impl ChangeSet {
    /// Change set of a command that touched `touched`.
    pub fn from_touched<'a>(touched: impl IntoIterator<Item = &'a Touched>) -> Self {
        let mut kinds = BTreeSet::from([ResourceKind::Characters]);
        kinds.extend(touched.into_iter().map(|t| match t {
            Touched::Player(_) => ResourceKind::Players,
            Touched::Character(_) => ResourceKind::Characters,
            Touched::Location(_) => ResourceKind::Locations,
            Touched::Obstacle(_) => ResourceKind::Obstacles,
            Touched::Path(_) => ResourceKind::Paths,
        }));
        Self(kinds)
    }

    /// Does the set include `kind`?
    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.0.contains(&kind)
    }

    /// Categories, ascending.
    pub fn iter(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.0.iter().copied()
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true; characters are always present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ChangeSet {
    fn default() -> Self {
        Self::from_touched(std::iter::empty())
    }
}

// =============================================================================
// TESTS
// =============================================================================
