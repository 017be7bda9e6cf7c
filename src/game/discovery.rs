//! Fog-of-War Discovery
//!
//! Depth-first flood fill that reveals the graph as characters explore it.
//! Flooding follows only outgoing, unobstructed, non-portal paths; a portal
//! destination is revealed when a character actually lands on it.

use serde::{Deserialize, Serialize};

use crate::core::ids::{LocationId, ObstacleId, PathId};
use crate::game::world::{Direction, World};

/// An entity revealed by discovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Revealed {
    /// A location became visible
    Location(LocationId),
    /// A path became visible
    Path(PathId),
    /// An obstacle became visible
    Obstacle(ObstacleId),
}

/// Discovery invoked where it must not be. Always a caller defect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// The location does not exist.
    #[error("Location {0} does not exist")]
    UnknownLocation(LocationId),

    /// The location was revealed before.
    #[error("Location {0} is already discovered")]
    AlreadyDiscovered(LocationId),
}

/// Reveal `location` and everything reachable from it.
///
/// For each visited location: mark it, mark every undiscovered path touching
/// it (either endpoint) and every undiscovered obstacle blocking such a path,
/// then continue into undiscovered neighbours reachable over an outgoing,
/// unblocked, non-portal path. Returns the revealed entities in visit order.
pub fn discover(world: &mut World, location: LocationId) -> Result<Vec<Revealed>, DiscoveryError> {
    match world.location(location) {
        None => return Err(DiscoveryError::UnknownLocation(location)),
        Some(l) if l.discovered => return Err(DiscoveryError::AlreadyDiscovered(location)),
        Some(_) => {}
    }

    let mut revealed = Vec::new();
    let mut stack = vec![location];

    while let Some(current) = stack.pop() {
        // A neighbour may be queued twice before it is reached
        if world.location(current).map_or(true, |l| l.discovered) {
            continue;
        }

        reveal_one(world, current, &mut revealed);

        let neighbours: Vec<LocationId> = world
            .paths_from(current)
            .filter(|p| p.direction != Direction::Portal && !world.is_blocked(p.id))
            .map(|p| p.to)
            .filter(|to| world.location(*to).is_some_and(|l| !l.discovered))
            .collect();

        // Reversed so the first neighbour is explored first
        stack.extend(neighbours.into_iter().rev());
    }

    Ok(revealed)
}

fn reveal_one(world: &mut World, location: LocationId, revealed: &mut Vec<Revealed>) {
    if let Some(l) = world.location_mut(location) {
        l.discovered = true;
    }
    revealed.push(Revealed::Location(location));

    let hidden_paths: Vec<PathId> = world
        .paths_touching(location)
        .filter(|p| !p.discovered)
        .map(|p| p.id)
        .collect();

    for path_id in hidden_paths {
        if let Some(p) = world.path_mut(path_id) {
            p.discovered = true;
        }
        revealed.push(Revealed::Path(path_id));

        let hidden_obstacles: Vec<ObstacleId> = world
            .blocking_obstacles(path_id)
            .iter()
            .copied()
            .filter(|id| world.obstacle(*id).is_some_and(|o| !o.discovered))
            .collect();

        for obstacle_id in hidden_obstacles {
            if let Some(o) = world.obstacle_mut(obstacle_id) {
                o.discovered = true;
            }
            revealed.push(Revealed::Obstacle(obstacle_id));
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
