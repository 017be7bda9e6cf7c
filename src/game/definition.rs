//! World Definitions
//!
//! The ingestion contract from the world loader: a named topology plus initial
//! character placements, consumed once when a game is created.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::ids::{CharacterId, LocationId};
use crate::game::events::GameEvent;
use crate::game::world::{validate_topology, Character, Location, Obstacle, Path, TopologyError};

/// Bundled 15-location sample world with one portal pair.
pub const GRID15_JSON: &str = include_str!("../../worlds/grid15.json");

/// A world definition that cannot be turned into a game.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// Malformed JSON.
    #[error("Invalid world definition JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Topology breaks a graph invariant.
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    /// Two characters share an id.
    #[error("Duplicate character {0}")]
    DuplicateCharacter(CharacterId),

    /// A character is placed on a location that does not exist.
    #[error("Character {character} placed on unknown location {location}")]
    CharacterLocation {
        /// Offending character
        character: CharacterId,
        /// Missing location
        location: LocationId,
    },

    /// No name given.
    #[error("World definition has no name")]
    MissingName,
}

/// A complete world, as produced by the loader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldDefinition {
    /// Definition name, identifies the world
    pub name: String,
    /// Locations
    pub locations: Vec<Location>,
    /// Directed paths
    pub paths: Vec<Path>,
    /// Obstacles
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    /// Initial character placements
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl WorldDefinition {
    /// Parse and validate a JSON definition.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let definition: Self = serde_json::from_str(json)?;
        definition.validate()?;
        Ok(definition)
    }

    /// The bundled sample world.
    pub fn grid15() -> Result<Self, DefinitionError> {
        Self::from_json(GRID15_JSON)
    }

    /// Check every referential invariant.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::MissingName);
        }

        validate_topology(&self.locations, &self.paths, &self.obstacles)?;

        let locations: BTreeSet<LocationId> = self.locations.iter().map(|l| l.id).collect();
        let mut characters = BTreeSet::new();
        for character in &self.characters {
            if !characters.insert(character.id) {
                return Err(DefinitionError::DuplicateCharacter(character.id));
            }
            if !locations.contains(&character.location) {
                return Err(DefinitionError::CharacterLocation {
                    character: character.id,
                    location: character.location,
                });
            }
        }

        Ok(())
    }

    /// The creation batch: `WorldLoaded`, one `CharacterAdded` per placement,
    /// then `RandomSeedSet`.
    pub fn into_events(self, seed: u32) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(self.characters.len() + 2);

        events.push(GameEvent::WorldLoaded {
            name: self.name,
            locations: self.locations,
            paths: self.paths,
            obstacles: self.obstacles,
        });
        events.extend(
            self.characters
                .into_iter()
                .map(|character| GameEvent::CharacterAdded { character }),
        );
        events.push(GameEvent::RandomSeedSet { seed });

        events
    }
}

// =============================================================================
// TESTS
// =============================================================================
