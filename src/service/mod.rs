//! Service Module
//!
//! Command, query and change-notification surface over the event log.
//! Non-deterministic (I/O, random game ids).

pub mod error;
pub mod game_service;
pub mod views;

pub use error::CommandError;
pub use game_service::GameService;
pub use views::{CharacterView, CommandOutcome, GameSummary, WorldUpdated};
