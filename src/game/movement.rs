//! Movement & Action Resolution
//!
//! Derives every legal action for a character from the current world and
//! validates requested actions against that derived set. Destinations are
//! always computed here by walking the ray, never taken from the request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::ids::{CharacterId, LocationId, ObstacleId, PathId};
use crate::game::events::GameEvent;
use crate::game::world::{Direction, ObstacleKind, Path, World};

// =============================================================================
// RAYS
// =============================================================================

/// One path segment of a ray.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Path travelled
    pub path: PathId,
    /// Location reached after this segment
    pub to: LocationId,
}

/// A maximal straight line of travel (or a single portal hop).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ray {
    /// Direction shared by every segment
    pub direction: Direction,
    /// Segments in travel order, never empty
    pub segments: Vec<Segment>,
}

impl Ray {
    /// Location reached after `steps` segments (1-indexed).
    pub fn destination(&self, steps: u32) -> Option<LocationId> {
        let index = usize::try_from(steps).ok()?.checked_sub(1)?;
        self.segments.get(index).map(|s| s.to)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Rays are never empty, kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Can a character step onto `path` right now?
fn is_open(world: &World, path: &Path, occupied: &BTreeSet<LocationId>) -> bool {
    path.discovered && !world.is_blocked(path.id) && !occupied.contains(&path.to)
}

/// All legal rays of travel from `at`.
///
/// One ray per open portal path, then for each cardinal direction one ray per
/// open initial path, extended along same-direction paths chained `to -> from`
/// until the next path is undiscovered, blocked, leads onto an occupied
/// location, or does not exist.
pub fn available_paths(world: &World, at: LocationId) -> Vec<Ray> {
    let occupied = world.occupied_locations();
    let initial: Vec<&Path> = world
        .paths_from(at)
        .filter(|p| is_open(world, p, &occupied))
        .collect();

    let mut rays: Vec<Ray> = initial
        .iter()
        .filter(|p| p.direction == Direction::Portal)
        .map(|p| Ray {
            direction: Direction::Portal,
            segments: vec![Segment { path: p.id, to: p.to }],
        })
        .collect();

    for direction in Direction::CARDINAL {
        for first in initial.iter().filter(|p| p.direction == direction) {
            rays.push(walk_ray(world, at, first, &occupied));
        }
    }

    rays
}

fn walk_ray(world: &World, at: LocationId, first: &Path, occupied: &BTreeSet<LocationId>) -> Ray {
    let direction = first.direction;
    let mut segments = vec![Segment { path: first.id, to: first.to }];
    // Malformed data could chain a same-direction loop; a ray never revisits
    let mut visited: BTreeSet<LocationId> = [at, first.to].into_iter().collect();
    let mut current = first.to;

    while let Some(next) = world
        .paths_from(current)
        .find(|p| p.direction == direction && is_open(world, p, occupied) && !visited.contains(&p.to))
    {
        segments.push(Segment { path: next.id, to: next.to });
        visited.insert(next.to);
        current = next.to;
    }

    Ray { direction, segments }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// A legal cardinal move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Cardinal direction
    pub direction: Direction,
    /// Number of path segments travelled
    pub steps: u32,
    /// Where the character lands
    pub destination: LocationId,
}

/// A legal portal hop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalMove {
    /// Portal path taken
    pub path: PathId,
    /// Where the character lands
    pub destination: LocationId,
}

/// The complete legal action set offered to a client for one character.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableActions {
    /// Every reachable distance along every cardinal ray
    pub movements: Vec<Movement>,
    /// Every open portal
    pub portals: Vec<PortalMove>,
    /// Obstacles this character's class can clear from here
    pub obstacles: Vec<ObstacleId>,
}

/// An action requested by a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Travel `steps` segments in a cardinal direction
    Move {
        /// Direction of travel
        direction: Direction,
        /// Segments to travel
        steps: u32,
    },
    /// Take a portal path
    UsePortal {
        /// Portal path id
        path: PathId,
    },
    /// Clear an obstacle
    ClearObstacle {
        /// Obstacle id
        obstacle: ObstacleId,
    },
}

/// Flatten cardinal rays into `{direction, steps}` actions.
pub fn movement_actions(world: &World, at: LocationId) -> Vec<Movement> {
    available_paths(world, at)
        .into_iter()
        .filter(|ray| ray.direction.is_cardinal())
        .flat_map(|ray| {
            let direction = ray.direction;
            ray.segments
                .into_iter()
                .zip(1u32..)
                .map(move |(segment, steps)| Movement { direction, steps, destination: segment.to })
        })
        .collect()
}

/// Open portals from `at`.
pub fn portal_actions(world: &World, at: LocationId) -> Vec<PortalMove> {
    available_paths(world, at)
        .into_iter()
        .filter(|ray| ray.direction == Direction::Portal)
        .filter_map(|ray| ray.segments.first().map(|s| PortalMove { path: s.path, destination: s.to }))
        .collect()
}

/// Obstacles of `kind` blocking at least one path leaving `at`.
pub fn obstacles_to_clear(world: &World, at: LocationId, kind: ObstacleKind) -> Vec<ObstacleId> {
    let leaving: BTreeSet<PathId> = world.paths_from(at).map(|p| p.id).collect();

    world
        .obstacles()
        .filter(|o| o.kind == kind && o.blocked_paths.iter().any(|p| leaving.contains(p)))
        .map(|o| o.id)
        .collect()
}

/// Everything a character may do right now.
pub fn available_actions(world: &World, character: CharacterId) -> Option<AvailableActions> {
    let character = world.character(character)?;

    Some(AvailableActions {
        movements: movement_actions(world, character.location),
        portals: portal_actions(world, character.location),
        obstacles: obstacles_to_clear(world, character.location, character.class.clears()),
    })
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// A requested action that cannot be executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No such character.
    #[error("Character {0} not found")]
    CharacterNotFound(CharacterId),

    /// Not in the freshly derived action set.
    #[error("Not an available action")]
    NotAnAvailableAction,
}

/// Validate `action` for `character` and produce the single event it causes.
///
/// The available set is derived fresh from `world`; nothing is mutated.
pub fn resolve(world: &World, character: CharacterId, action: Action) -> Result<GameEvent, ResolveError> {
    let available = available_actions(world, character).ok_or(ResolveError::CharacterNotFound(character))?;

    let event = match action {
        Action::Move { direction, steps } => available
            .movements
            .iter()
            .find(|m| m.direction == direction && m.steps == steps)
            .map(|m| GameEvent::CharacterMoved { character, location: m.destination }),
        Action::UsePortal { path } => available
            .portals
            .iter()
            .find(|p| p.path == path)
            .map(|p| GameEvent::CharacterMoved { character, location: p.destination }),
        Action::ClearObstacle { obstacle } => available
            .obstacles
            .contains(&obstacle)
            .then_some(GameEvent::ObstacleRemoved { obstacle }),
    };

    event.ok_or(ResolveError::NotAnAvailableAction)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::definition::tests::grid_game;
    use crate::game::state::Game;
    use crate::game::world::{Character, CharacterClass, Location, Obstacle};
    use crate::core::ids::GameId;
    use proptest::prelude::*;

    fn moves_of(actions: &[Movement], direction: Direction) -> Vec<(u32, u32)> {
        actions
            .iter()
            .filter(|m| m.direction == direction)
            .map(|m| (m.steps, m.destination.value()))
            .collect()
    }

    #[test]
    fn test_grid_actions_from_portal_room() {
        let game = grid_game();
        let mage = CharacterId(0);

        let actions = available_actions(&game.world, mage).unwrap();

        assert_eq!(
            actions.portals,
            vec![PortalMove { path: PathId(23), destination: LocationId(14) }]
        );
        assert_eq!(moves_of(&actions.movements, Direction::North), vec![(1, 7), (2, 3)]);
        assert!(moves_of(&actions.movements, Direction::South).is_empty());
        assert!(actions.obstacles.is_empty());
    }

    #[test]
    fn test_ray_stops_before_occupied_location() {
        let game = grid_game();

        // 8 -> 9 is east, but the warrior stands on 9
        let rays = available_paths(&game.world, LocationId(8));
        assert!(rays.iter().all(|r| r.direction != Direction::East));

        // From 10 westward the first step is already occupied
        let west = moves_of(&movement_actions(&game.world, LocationId(10)), Direction::West);
        assert!(west.is_empty());
    }

    #[test]
    fn test_ray_stops_at_blocked_path() {
        let game = grid_game();

        // 8 -> 4 -> 0 north; 4 -> 0 carries the force field
        let north = moves_of(&movement_actions(&game.world, LocationId(8)), Direction::North);
        assert_eq!(north, vec![(1, 4)]);
    }

    #[test]
    fn test_undiscovered_paths_not_offered() {
        let game = grid_game();

        // 13 is not discovered yet, so nothing leads out of it
        assert!(available_paths(&game.world, LocationId(13)).is_empty());
    }

    #[test]
    fn test_obstacles_to_clear_by_kind() {
        let mut game = grid_game();
        game.apply(&GameEvent::CharacterMoved { character: CharacterId(0), location: LocationId(4) })
            .unwrap();

        let at_four = obstacles_to_clear(&game.world, LocationId(4), ObstacleKind::ForceField);
        assert_eq!(at_four, vec![ObstacleId(0)]);

        assert!(obstacles_to_clear(&game.world, LocationId(4), ObstacleKind::Stone).is_empty());
        assert!(obstacles_to_clear(&game.world, LocationId(8), ObstacleKind::ForceField).is_empty());

        let mage = available_actions(&game.world, CharacterId(0)).unwrap();
        assert_eq!(mage.obstacles, vec![ObstacleId(0)]);
    }

    #[test]
    fn test_resolve_computes_destination() {
        let game = grid_game();

        let event = resolve(
            &game.world,
            CharacterId(0),
            Action::Move { direction: Direction::North, steps: 2 },
        )
        .unwrap();
        assert_eq!(event, GameEvent::CharacterMoved { character: CharacterId(0), location: LocationId(3) });

        let event = resolve(&game.world, CharacterId(0), Action::UsePortal { path: PathId(23) }).unwrap();
        assert_eq!(event, GameEvent::CharacterMoved { character: CharacterId(0), location: LocationId(14) });
    }

    #[test]
    fn test_resolve_rejects_phantom_actions() {
        let game = grid_game();
        let mage = CharacterId(0);

        for action in [
            Action::Move { direction: Direction::North, steps: 3 },
            Action::Move { direction: Direction::North, steps: 0 },
            Action::Move { direction: Direction::South, steps: 1 },
            Action::Move { direction: Direction::Portal, steps: 1 },
            Action::UsePortal { path: PathId(29) },
            Action::UsePortal { path: PathId(22) },
            Action::ClearObstacle { obstacle: ObstacleId(0) },
        ] {
            assert_eq!(
                resolve(&game.world, mage, action),
                Err(ResolveError::NotAnAvailableAction),
                "{action:?}"
            );
        }

        assert_eq!(
            resolve(&game.world, CharacterId(42), Action::UsePortal { path: PathId(23) }),
            Err(ResolveError::CharacterNotFound(CharacterId(42)))
        );
    }

    #[test]
    fn test_wrong_class_cannot_clear() {
        let mut game = grid_game();
        // Warrior walks up to the force field
        game.apply(&GameEvent::CharacterMoved { character: CharacterId(1), location: LocationId(4) })
            .unwrap();

        let warrior = available_actions(&game.world, CharacterId(1)).unwrap();
        assert!(warrior.obstacles.is_empty());
        assert_eq!(
            resolve(&game.world, CharacterId(1), Action::ClearObstacle { obstacle: ObstacleId(0) }),
            Err(ResolveError::NotAnAvailableAction)
        );
    }

    #[test]
    fn test_action_wire_format() {
        let action: Action = serde_json::from_str(r#"{"action":"move","direction":"east","steps":3}"#).unwrap();
        assert_eq!(action, Action::Move { direction: Direction::East, steps: 3 });

        let action: Action = serde_json::from_str(r#"{"action":"use_portal","path":23}"#).unwrap();
        assert_eq!(action, Action::UsePortal { path: PathId(23) });
    }

    // =========================================================================
    // Movement soundness over random grids
    // =========================================================================

    /// Random open grid: each cell connected to its right/down neighbour with
    /// some probability (both directions), a few random obstacles and
    /// characters.
    fn random_grid_game(
        width: u32,
        height: u32,
        links: &[bool],
        blocked: &[bool],
        character_cells: &[u32],
    ) -> Game {
        let cell = |x: u32, y: u32| LocationId(y * width + x);
        let locations: Vec<Location> = (0..width * height).map(|i| Location::new(LocationId(i))).collect();

        let mut paths = Vec::new();
        let mut obstacles = Vec::new();
        let mut link_index = 0usize;
        for y in 0..height {
            for x in 0..width {
                let mut neighbours = Vec::new();
                if x + 1 < width {
                    neighbours.push((cell(x + 1, y), Direction::East, Direction::West));
                }
                if y + 1 < height {
                    neighbours.push((cell(x, y + 1), Direction::South, Direction::North));
                }
                for (other, there, back) in neighbours {
                    let open = links.get(link_index).copied().unwrap_or(true);
                    let block = blocked.get(link_index).copied().unwrap_or(false);
                    link_index += 1;
                    if !open {
                        continue;
                    }
                    let forward = PathId(paths.len() as u32);
                    paths.push(Path::new(forward, cell(x, y), other, there));
                    let backward = PathId(paths.len() as u32);
                    paths.push(Path::new(backward, other, cell(x, y), back));
                    if block {
                        obstacles.push(Obstacle::new(
                            ObstacleId(obstacles.len() as u32),
                            ObstacleKind::Stone,
                            vec![forward, backward],
                        ));
                    }
                }
            }
        }

        let mut game = Game::new(GameId::new_random());
        game.apply(&GameEvent::WorldLoaded { name: "random".to_string(), locations, paths, obstacles })
            .unwrap();

        let mut used = BTreeSet::new();
        for (index, cell) in character_cells.iter().enumerate() {
            let location = LocationId(cell % (width * height));
            if !used.insert(location) {
                continue;
            }
            let character = Character::new(CharacterId(index as u32), CharacterClass::Warrior, location);
            game.apply(&GameEvent::CharacterAdded { character }).unwrap();
        }
        game
    }

    /// Walk `steps` same-direction segments by hand and return the landing site.
    fn walk_by_hand(world: &World, from: LocationId, direction: Direction, steps: u32) -> Option<LocationId> {
        let occupied = world.occupied_locations();
        let mut current = from;
        for _ in 0..steps {
            let next = world
                .paths_from(current)
                .find(|p| p.direction == direction && p.discovered && !world.is_blocked(p.id))?;
            if occupied.contains(&next.to) {
                return None;
            }
            current = next.to;
        }
        Some(current)
    }

    proptest! {
        #[test]
        fn prop_every_advertised_move_lands_where_advertised(
            width in 2u32..6,
            height in 2u32..6,
            links in proptest::collection::vec(proptest::bool::weighted(0.8), 64),
            blocked in proptest::collection::vec(proptest::bool::weighted(0.15), 64),
            character_cells in proptest::collection::vec(0u32..36, 1..4),
        ) {
            let game = random_grid_game(width, height, &links, &blocked, &character_cells);

            for character in game.world.characters() {
                let available = available_actions(&game.world, character.id).unwrap();
                for movement in &available.movements {
                    let event = resolve(
                        &game.world,
                        character.id,
                        Action::Move { direction: movement.direction, steps: movement.steps },
                    ).unwrap();

                    let mut next = game.clone();
                    next.apply(&event).unwrap();
                    let landed = next.world.character(character.id).unwrap().location;

                    prop_assert_eq!(landed, movement.destination);
                    prop_assert_eq!(
                        walk_by_hand(&game.world, character.location, movement.direction, movement.steps),
                        Some(movement.destination)
                    );
                }

                // One step past the end of every ray is never offered
                for direction in Direction::CARDINAL {
                    let longest = available.movements.iter()
                        .filter(|m| m.direction == direction)
                        .map(|m| m.steps)
                        .max()
                        .unwrap_or(0);
                    prop_assert_eq!(
                        resolve(&game.world, character.id, Action::Move { direction, steps: longest + 1 }),
                        Err(ResolveError::NotAnAvailableAction)
                    );
                }
            }
        }
    }
}
