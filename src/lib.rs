//! # Maze Engine
//!
//! Event-sourced game-state engine for a turn-based, multiplayer maze
//! exploration game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        MAZE ENGINE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── ids.rs      - Newtype identifiers                       │
//! │  ├── seed.rs     - Game seed derivation                      │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game-state engine (deterministic)         │
//! │  ├── world.rs    - Maze graph model                          │
//! │  ├── definition.rs - World definitions (ingestion)           │
//! │  ├── discovery.rs- Fog-of-war flood fill                     │
//! │  ├── movement.rs - Available actions and resolution          │
//! │  ├── actions.rs  - Action partitioning across players        │
//! │  ├── events.rs   - Event taxonomy, change sets               │
//! │  └── state.rs    - Game aggregate and event fold             │
//! │                                                              │
//! │  store/          - Event log (non-deterministic)             │
//! │  ├── event_store.rs - Records, in-memory and file stores     │
//! │  └── repository.rs  - Load-by-fold, append-at-version        │
//! │                                                              │
//! │  service/        - Commands, queries, change feed            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - No runtime RNG; the only seed is fixed in the history
//!
//! Folding the same event history twice produces identical games with
//! identical state hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::EngineConfig;
pub use crate::core::ids::{CharacterId, GameId, LocationId, ObstacleId, PathId, PlayerId};
pub use game::{Direction, Game, GameEvent, WorldDefinition};
pub use service::{CommandError, GameService};
pub use store::{EventStore, FileEventStore, InMemoryEventStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
