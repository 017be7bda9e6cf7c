//! Game Logic Module
//!
//! The game-state engine. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `world`: Maze graph model (locations, paths, obstacles, characters)
//! - `definition`: World definitions ingested at game creation
//! - `discovery`: Fog-of-war flood fill
//! - `movement`: Available actions and action resolution
//! - `actions`: Action vocabulary and partitioning across players
//! - `events`: Event taxonomy and change tracking
//! - `state`: Game aggregate and the event fold

pub mod actions;
pub mod definition;
pub mod discovery;
pub mod events;
pub mod movement;
pub mod state;
pub mod world;

// Re-export key types
pub use actions::{ActionName, MAX_PLAYERS};
pub use definition::{DefinitionError, WorldDefinition};
pub use discovery::{DiscoveryError, Revealed};
pub use events::{ChangeSet, GameEvent, ResourceKind, Touched};
pub use movement::{Action, AvailableActions, Movement, PortalMove, Ray, ResolveError};
pub use state::{ApplyError, Game, Player};
pub use world::{Character, CharacterClass, Direction, Location, Obstacle, ObstacleKind, Path, World};
