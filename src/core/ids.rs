//! Identifier Types
//!
//! Every entity in a world is addressed by a small integer identifier.
//! Entities never hold references to each other; neighbour lookups always
//! go back through the owning collection by identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Create from a raw value.
            pub const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Get the raw value.
            pub const fn value(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Location (graph node) identifier.
    LocationId
);
entity_id!(
    /// Directed path (graph edge) identifier.
    PathId
);
entity_id!(
    /// Obstacle identifier.
    ObstacleId
);
entity_id!(
    /// Character identifier.
    CharacterId
);
entity_id!(
    /// Player identifier. Always the lowest id unused by the current roster.
    PlayerId
);

// =============================================================================
// GAME ID
// =============================================================================

/// Game identifier, assigned once at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl GameId {
    /// Generate a fresh random game id.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_serializes_transparently() {
        let json = serde_json::to_string(&LocationId::new(11)).unwrap();
        assert_eq!(json, "11");

        let back: PathId = serde_json::from_str("23").unwrap();
        assert_eq!(back, PathId(23));
    }

    #[test]
    fn test_game_id_parse_display() {
        let id = GameId::new_random();
        let parsed: GameId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);

        assert!("not-a-game".parse::<GameId>().is_err());
    }
}
