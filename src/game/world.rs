//! Maze Graph Model
//!
//! Locations connected by directed, typed paths; obstacles that block paths;
//! characters standing on locations. Uses BTreeMap for deterministic
//! iteration order and keeps secondary indices so that "which paths leave
//! location X" costs O(out-degree).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::hash::StateHasher;
use crate::core::ids::{CharacterId, LocationId, ObstacleId, PathId};

// =============================================================================
// DIRECTION
// =============================================================================

/// Direction of travel along a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Direction {
    /// Towards smaller x
    West = 0,
    /// Towards larger x
    East = 1,
    /// Towards smaller y
    North = 2,
    /// Towards larger y
    South = 3,
    /// Non-adjacent shortcut, no straight-line semantics
    Portal = 4,
}

impl Direction {
    /// Cardinal directions, in the order rays are offered.
    pub const CARDINAL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::North,
        Direction::South,
    ];

    /// Is this one of the four straight-line directions?
    #[inline]
    pub fn is_cardinal(self) -> bool {
        !matches!(self, Direction::Portal)
    }
}

// =============================================================================
// OBSTACLE KIND / CHARACTER CLASS
// =============================================================================

/// Kind of obstacle. Each kind is clearable by exactly one character class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ObstacleKind {
    /// Cleared by a Mage
    ForceField = 0,
    /// Cleared by a Rogue
    Lock = 1,
    /// Cleared by a Warrior
    Stone = 2,
    /// Cleared by a Cleric
    Ghost = 3,
}

/// Character role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CharacterClass {
    /// Dispels force fields
    Mage = 0,
    /// Picks locks
    Rogue = 1,
    /// Smashes stones
    Warrior = 2,
    /// Banishes ghosts
    Cleric = 3,
}

impl CharacterClass {
    /// The only obstacle kind this class can clear.
    pub fn clears(self) -> ObstacleKind {
        match self {
            CharacterClass::Mage => ObstacleKind::ForceField,
            CharacterClass::Rogue => ObstacleKind::Lock,
            CharacterClass::Warrior => ObstacleKind::Stone,
            CharacterClass::Cleric => ObstacleKind::Ghost,
        }
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// A node of the maze graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Location identifier
    pub id: LocationId,

    /// Revealed by discovery?
    #[serde(default)]
    pub discovered: bool,
}

impl Location {
    /// Create an undiscovered location.
    pub fn new(id: LocationId) -> Self {
        Self { id, discovered: false }
    }
}

/// A directed edge. A two-way corridor is two paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// Path identifier
    pub id: PathId,

    /// Source location
    pub from: LocationId,

    /// Destination location
    pub to: LocationId,

    /// Direction of travel
    pub direction: Direction,

    /// Revealed by discovery?
    #[serde(default)]
    pub discovered: bool,
}

impl Path {
    /// Create an undiscovered path.
    pub fn new(id: PathId, from: LocationId, to: LocationId, direction: Direction) -> Self {
        Self { id, from, to, direction, discovered: false }
    }

    /// Does this path start or end at `location`?
    #[inline]
    pub fn touches(&self, location: LocationId) -> bool {
        self.from == location || self.to == location
    }
}

/// Something blocking one or more paths until cleared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Obstacle identifier
    pub id: ObstacleId,

    /// Which class can clear it
    pub kind: ObstacleKind,

    /// Paths made impassable while this obstacle exists
    pub blocked_paths: Vec<PathId>,

    /// Revealed by discovery?
    #[serde(default)]
    pub discovered: bool,
}

impl Obstacle {
    /// Create an undiscovered obstacle.
    pub fn new(id: ObstacleId, kind: ObstacleKind, blocked_paths: Vec<PathId>) -> Self {
        Self { id, kind, blocked_paths, discovered: false }
    }
}

/// A character standing on a location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Character identifier
    pub id: CharacterId,

    /// Role, fixes which obstacles it can clear
    pub class: CharacterClass,

    /// Current location
    pub location: LocationId,
}

impl Character {
    /// Create a character.
    pub fn new(id: CharacterId, class: CharacterClass, location: LocationId) -> Self {
        Self { id, class, location }
    }
}

// =============================================================================
// TOPOLOGY VALIDATION
// =============================================================================

/// A world topology that breaks a graph invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    /// Two locations share an id.
    #[error("Duplicate location {0}")]
    DuplicateLocation(LocationId),

    /// Two paths share an id.
    #[error("Duplicate path {0}")]
    DuplicatePath(PathId),

    /// Two obstacles share an id.
    #[error("Duplicate obstacle {0}")]
    DuplicateObstacle(ObstacleId),

    /// A path endpoint references no location.
    #[error("Path {path} references unknown location {location}")]
    DanglingPath {
        /// Offending path
        path: PathId,
        /// Missing endpoint
        location: LocationId,
    },

    /// An obstacle blocks a path that does not exist.
    #[error("Obstacle {obstacle} blocks unknown path {path}")]
    DanglingObstacle {
        /// Offending obstacle
        obstacle: ObstacleId,
        /// Missing path
        path: PathId,
    },
}

/// Check the referential invariants of a topology before it is installed.
pub fn validate_topology(
    locations: &[Location],
    paths: &[Path],
    obstacles: &[Obstacle],
) -> Result<(), TopologyError> {
    let mut location_ids = BTreeSet::new();
    for location in locations {
        if !location_ids.insert(location.id) {
            return Err(TopologyError::DuplicateLocation(location.id));
        }
    }

    let mut path_ids = BTreeSet::new();
    for path in paths {
        if !path_ids.insert(path.id) {
            return Err(TopologyError::DuplicatePath(path.id));
        }
        for endpoint in [path.from, path.to] {
            if !location_ids.contains(&endpoint) {
                return Err(TopologyError::DanglingPath { path: path.id, location: endpoint });
            }
        }
    }

    let mut obstacle_ids = BTreeSet::new();
    for obstacle in obstacles {
        if !obstacle_ids.insert(obstacle.id) {
            return Err(TopologyError::DuplicateObstacle(obstacle.id));
        }
        if let Some(missing) = obstacle.blocked_paths.iter().find(|p| !path_ids.contains(p)) {
            return Err(TopologyError::DanglingObstacle { obstacle: obstacle.id, path: *missing });
        }
    }

    Ok(())
}

// =============================================================================
// WORLD
// =============================================================================

/// The maze: locations, paths, obstacles and the characters inside it.
///
/// Only event folding mutates a world; every mutator is crate-private.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct World {
    /// Name of the originating world definition (None until loaded)
    name: Option<String>,

    locations: BTreeMap<LocationId, Location>,
    paths: BTreeMap<PathId, Path>,
    obstacles: BTreeMap<ObstacleId, Obstacle>,
    characters: BTreeMap<CharacterId, Character>,

    /// Paths leaving each location, ascending path id
    outgoing: BTreeMap<LocationId, Vec<PathId>>,
    /// Paths with either endpoint at each location, ascending path id
    incident: BTreeMap<LocationId, Vec<PathId>>,
    /// Obstacles currently blocking each path
    blockers: BTreeMap<PathId, Vec<ObstacleId>>,
}

impl World {
    /// Create an empty, unloaded world.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Has a topology been installed?
    pub fn is_loaded(&self) -> bool {
        self.name.is_some()
    }

    /// Name of the world definition this world came from.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Get a location by id.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Get a path by id.
    pub fn path(&self, id: PathId) -> Option<&Path> {
        self.paths.get(&id)
    }

    /// Get an obstacle by id.
    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(&id)
    }

    /// Get a character by id.
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// All locations, ascending id.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// All paths, ascending id.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    /// All obstacles still standing, ascending id.
    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values()
    }

    /// All characters, ascending id.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Paths leaving `location`.
    pub fn paths_from(&self, location: LocationId) -> impl Iterator<Item = &Path> {
        self.indexed_paths(self.outgoing.get(&location))
    }

    /// Paths leaving or entering `location`.
    pub fn paths_touching(&self, location: LocationId) -> impl Iterator<Item = &Path> {
        self.indexed_paths(self.incident.get(&location))
    }

    fn indexed_paths<'a>(&'a self, ids: Option<&'a Vec<PathId>>) -> impl Iterator<Item = &'a Path> {
        ids.into_iter()
            .flatten()
            .filter_map(move |id| self.paths.get(id))
    }

    /// Is the path impassable because an obstacle blocks it?
    #[inline]
    pub fn is_blocked(&self, path: PathId) -> bool {
        self.blockers.get(&path).is_some_and(|b| !b.is_empty())
    }

    /// Obstacles blocking a path.
    pub fn blocking_obstacles(&self, path: PathId) -> &[ObstacleId] {
        self.blockers.get(&path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Locations currently occupied by a character.
    pub fn occupied_locations(&self) -> BTreeSet<LocationId> {
        self.characters.values().map(|c| c.location).collect()
    }

    /// Character standing on `location`, if any.
    pub fn occupant(&self, location: LocationId) -> Option<&Character> {
        self.characters.values().find(|c| c.location == location)
    }

    /// Locations revealed so far.
    pub fn discovered_locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values().filter(|l| l.discovered)
    }

    /// Paths revealed so far.
    pub fn discovered_paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values().filter(|p| p.discovered)
    }

    /// Obstacles revealed so far.
    pub fn discovered_obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.values().filter(|o| o.discovered)
    }

    // ========================================================================
    // Mutators (event folding only)
    // ========================================================================

    /// Install a validated topology. Discovery state always starts hidden.
    pub(crate) fn install(
        &mut self,
        name: String,
        locations: Vec<Location>,
        paths: Vec<Path>,
        obstacles: Vec<Obstacle>,
    ) {
        self.name = Some(name);
        self.locations = locations
            .into_iter()
            .map(|l| (l.id, Location { discovered: false, ..l }))
            .collect();
        self.paths = paths
            .into_iter()
            .map(|p| (p.id, Path { discovered: false, ..p }))
            .collect();
        self.obstacles = obstacles
            .into_iter()
            .map(|o| (o.id, Obstacle { discovered: false, ..o }))
            .collect();
        self.rebuild_topology_index();
        self.rebuild_blockers();
    }

    pub(crate) fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    pub(crate) fn path_mut(&mut self, id: PathId) -> Option<&mut Path> {
        self.paths.get_mut(&id)
    }

    pub(crate) fn obstacle_mut(&mut self, id: ObstacleId) -> Option<&mut Obstacle> {
        self.obstacles.get_mut(&id)
    }

    pub(crate) fn insert_character(&mut self, character: Character) {
        self.characters.insert(character.id, character);
    }

    pub(crate) fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// Remove an obstacle; the paths it blocked become passable.
    pub(crate) fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        let removed = self.obstacles.remove(&id)?;
        self.rebuild_blockers();
        Some(removed)
    }

    fn rebuild_topology_index(&mut self) {
        self.outgoing.clear();
        self.incident.clear();
        for path in self.paths.values() {
            self.outgoing.entry(path.from).or_default().push(path.id);
            self.incident.entry(path.from).or_default().push(path.id);
            if path.to != path.from {
                self.incident.entry(path.to).or_default().push(path.id);
            }
        }
    }

    fn rebuild_blockers(&mut self) {
        self.blockers.clear();
        for obstacle in self.obstacles.values() {
            for path in &obstacle.blocked_paths {
                self.blockers.entry(*path).or_default().push(obstacle.id);
            }
        }
    }

    /// Hash this world's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_str(self.name.as_deref().unwrap_or(""));
        for location in self.locations.values() {
            hasher.update_u32(location.id.value());
            hasher.update_bool(location.discovered);
        }
        for path in self.paths.values() {
            hasher.update_u32(path.id.value());
            hasher.update_u32(path.from.value());
            hasher.update_u32(path.to.value());
            hasher.update_u8(path.direction as u8);
            hasher.update_bool(path.discovered);
        }
        for obstacle in self.obstacles.values() {
            hasher.update_u32(obstacle.id.value());
            hasher.update_u8(obstacle.kind as u8);
            hasher.update_u64(obstacle.blocked_paths.len() as u64);
            for path in &obstacle.blocked_paths {
                hasher.update_u32(path.value());
            }
            hasher.update_bool(obstacle.discovered);
        }
        for character in self.characters.values() {
            hasher.update_u32(character.id.value());
            hasher.update_u8(character.class as u8);
            hasher.update_u32(character.location.value());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
