//! Game Aggregate
//!
//! The root aggregate and the fold that rebuilds it from its event history.
//! Folding is deterministic and side-effect-free: two replays of the same
//! history produce identical games (and identical state hashes).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::ids::{CharacterId, GameId, LocationId, ObstacleId, PlayerId};
use crate::game::actions::{action_sets, assign, ActionName, MAX_PLAYERS};
use crate::game::discovery::{discover, DiscoveryError};
use crate::game::events::{GameEvent, Touched};
use crate::game::world::{validate_topology, TopologyError, World};

// =============================================================================
// PLAYER
// =============================================================================

/// A connected player and the controls currently delegated to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player identifier (lowest unused at join time)
    pub id: PlayerId,

    /// Display name
    pub name: String,

    /// Delegated actions
    pub actions: Vec<ActionName>,
}

/// Lowest non-negative id not in `taken`.
pub fn next_player_id(taken: impl IntoIterator<Item = PlayerId>) -> PlayerId {
    let taken: BTreeSet<PlayerId> = taken.into_iter().collect();
    (0u32..)
        .map(PlayerId)
        .find(|id| !taken.contains(id))
        .unwrap_or_default()
}

// =============================================================================
// ERRORS
// =============================================================================

/// An event whose precondition does not hold. The game is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// WorldLoaded on a game that already has a world.
    #[error("World already loaded")]
    WorldAlreadyLoaded,

    /// An event that needs a world arrived before WorldLoaded.
    #[error("World not loaded")]
    WorldNotLoaded,

    /// WorldLoaded carried a broken topology.
    #[error("Invalid topology: {0}")]
    InvalidTopology(#[from] TopologyError),

    /// CharacterAdded for an id already in use.
    #[error("Character {0} already exists")]
    CharacterExists(CharacterId),

    /// No such character.
    #[error("Character {0} not found")]
    CharacterNotFound(CharacterId),

    /// No such location.
    #[error("Location {0} not found")]
    LocationNotFound(LocationId),

    /// No such obstacle.
    #[error("Obstacle {0} not found")]
    ObstacleNotFound(ObstacleId),

    /// No such player.
    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    /// PlayerJoined with the room at capacity.
    #[error("Room is full ({0} players)")]
    RoomFull(usize),

    /// PlayerJoined before RandomSeedSet.
    #[error("Random seed not set")]
    RandomSeedNotSet,

    /// RandomSeedSet twice.
    #[error("Random seed already set")]
    RandomSeedAlreadySet,

    /// Discovery invoked on a bad target.
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),
}

// =============================================================================
// GAME
// =============================================================================

/// Root aggregate: one world, the connected players and the random seed.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Game {
    /// Game identifier
    id: GameId,

    /// The maze
    pub(crate) world: World,

    /// Connected players by id
    players: BTreeMap<PlayerId, Player>,

    /// Fixed once at creation
    random_seed: Option<u32>,
}

impl Game {
    /// Empty aggregate, seeded only with its id.
    pub fn new(id: GameId) -> Self {
        Self {
            id,
            world: World::new(),
            players: BTreeMap::new(),
            random_seed: None,
        }
    }

    /// Fold a whole history, in order, from an empty aggregate.
    pub fn replay<'a>(
        id: GameId,
        events: impl IntoIterator<Item = &'a GameEvent>,
    ) -> Result<Self, ApplyError> {
        let mut game = Self::new(id);
        for event in events {
            game.apply(event)?;
        }
        Ok(game)
    }

    /// Game identifier.
    pub fn id(&self) -> GameId {
        self.id
    }

    /// The maze.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Random seed, once set.
    pub fn random_seed(&self) -> Option<u32> {
        self.random_seed
    }

    /// Get a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// All players, ascending id.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of connected players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Id the next joining player will receive.
    pub fn next_player_id(&self) -> PlayerId {
        next_player_id(self.players.keys().copied())
    }

    /// Fold one event.
    ///
    /// Every precondition is checked before anything is mutated, so an
    /// `Err` leaves the game exactly as it was.
    pub fn apply(&mut self, event: &GameEvent) -> Result<Vec<Touched>, ApplyError> {
        match event {
            GameEvent::WorldLoaded { name, locations, paths, obstacles } => {
                if self.world.is_loaded() {
                    return Err(ApplyError::WorldAlreadyLoaded);
                }
                validate_topology(locations, paths, obstacles)?;

                self.world
                    .install(name.clone(), locations.clone(), paths.clone(), obstacles.clone());
                Ok(Vec::new())
            }

            GameEvent::CharacterAdded { character } => {
                self.require_world()?;
                if self.world.character(character.id).is_some() {
                    return Err(ApplyError::CharacterExists(character.id));
                }
                let hidden = self.hidden_location(character.location)?;

                self.world.insert_character(character.clone());
                let mut touched = vec![Touched::Character(character.id)];
                if hidden {
                    touched.extend(self.discover(character.location)?);
                }
                Ok(touched)
            }

            GameEvent::CharacterMoved { character, location } => {
                self.require_world()?;
                if self.world.character(*character).is_none() {
                    return Err(ApplyError::CharacterNotFound(*character));
                }
                let hidden = self.hidden_location(*location)?;

                if let Some(c) = self.world.character_mut(*character) {
                    c.location = *location;
                }
                let mut touched = vec![Touched::Character(*character)];
                if hidden {
                    touched.extend(self.discover(*location)?);
                }
                Ok(touched)
            }

            GameEvent::ObstacleRemoved { obstacle } => {
                let removed = self
                    .world
                    .remove_obstacle(*obstacle)
                    .ok_or(ApplyError::ObstacleNotFound(*obstacle))?;

                let mut touched = vec![Touched::Obstacle(removed.id)];
                touched.extend(removed.blocked_paths.iter().map(|p| Touched::Path(*p)));

                let endpoints: Vec<LocationId> = removed
                    .blocked_paths
                    .iter()
                    .filter_map(|p| self.world.path(*p))
                    .flat_map(|p| [p.from, p.to])
                    .collect();
                for location in endpoints {
                    // An earlier endpoint's flood may already have reached it
                    if self.world.location(location).is_some_and(|l| !l.discovered) {
                        touched.extend(self.discover(location)?);
                    }
                }
                Ok(touched)
            }

            GameEvent::PlayerJoined { name } => {
                if self.random_seed.is_none() {
                    return Err(ApplyError::RandomSeedNotSet);
                }
                if self.players.len() >= MAX_PLAYERS {
                    return Err(ApplyError::RoomFull(self.players.len()));
                }

                let id = self.next_player_id();
                self.players.insert(id, Player { id, name: name.clone(), actions: Vec::new() });
                Ok(self.reassign_actions())
            }

            GameEvent::PlayerLeft { player } => {
                if self.players.remove(player).is_none() {
                    return Err(ApplyError::PlayerNotFound(*player));
                }

                let mut touched = vec![Touched::Player(*player)];
                touched.extend(self.reassign_actions());
                Ok(touched)
            }

            GameEvent::RandomSeedSet { seed } => {
                if self.random_seed.is_some() {
                    return Err(ApplyError::RandomSeedAlreadySet);
                }
                self.random_seed = Some(*seed);
                Ok(Vec::new())
            }
        }
    }

    fn require_world(&self) -> Result<(), ApplyError> {
        if self.world.is_loaded() {
            Ok(())
        } else {
            Err(ApplyError::WorldNotLoaded)
        }
    }

    /// Is `location` present but not yet discovered?
    fn hidden_location(&self, location: LocationId) -> Result<bool, ApplyError> {
        self.world
            .location(location)
            .map(|l| !l.discovered)
            .ok_or(ApplyError::LocationNotFound(location))
    }

    fn discover(&mut self, location: LocationId) -> Result<Vec<Touched>, ApplyError> {
        let revealed = discover(&mut self.world, location)?;
        Ok(revealed.into_iter().map(Touched::from).collect())
    }

    /// Re-partition the action vocabulary over the full current roster.
    fn reassign_actions(&mut self) -> Vec<Touched> {
        let roster: Vec<PlayerId> = self.players.keys().copied().collect();
        let seed = self.random_seed.unwrap_or_default();

        for player in self.players.values_mut() {
            player.actions.clear();
        }
        for (id, actions) in assign(action_sets(roster.len()), &roster, seed) {
            if let Some(player) = self.players.get_mut(&id) {
                player.actions = actions;
            }
        }

        roster.into_iter().map(Touched::Player).collect()
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.id.as_bytes(), self.random_seed, |hasher| {
            self.world.hash_into(hasher);

            // Players in id order (BTreeMap guarantees this)
            for player in self.players.values() {
                hasher.update_u32(player.id.value());
                hasher.update_str(&player.name);
                hasher.update_u64(player.actions.len() as u64);
                for action in &player.actions {
                    hasher.update_u8(*action as u8);
                }
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
