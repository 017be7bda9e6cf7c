//! Command Errors
//!
//! Every failure a command or query can return to its caller.

use crate::core::ids::{CharacterId, GameId, PlayerId};
use crate::game::definition::DefinitionError;
use crate::game::movement::ResolveError;
use crate::game::state::ApplyError;
use crate::store::event_store::EventStoreError;
use crate::store::repository::LoadError;

/// Command surface errors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// No such game.
    #[error("Game {0} not found")]
    GameNotFound(GameId),

    /// No such character in the game.
    #[error("Character {0} not found")]
    CharacterNotFound(CharacterId),

    /// No such player in the game.
    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    /// Requested action is not in the freshly derived action set.
    #[error("Not an available action")]
    NotAnAvailableAction,

    /// The room is at capacity.
    #[error("Room is full ({max} players)")]
    RoomFull {
        /// Room cap
        max: usize,
    },

    /// Another writer appended first. Re-read and retry the whole command.
    #[error("Version conflict: expected {expected}, stream is at {actual}")]
    VersionConflict {
        /// Version the command was decided against
        expected: u64,
        /// Actual stream version
        actual: u64,
    },

    /// The world definition cannot be used.
    #[error("Invalid world: {0}")]
    InvalidWorld(#[from] DefinitionError),

    /// The log or the fold broke an invariant. A defect, not a user error.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The event store failed.
    #[error("Event store error: {0}")]
    Store(#[from] EventStoreError),
}

impl CommandError {
    /// Is retrying the whole command (re-read, re-resolve, re-append) sensible?
    pub fn is_retryable(&self) -> bool {
        matches!(self, CommandError::VersionConflict { .. })
    }
}

impl From<LoadError> for CommandError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::NotFound(game_id) => CommandError::GameNotFound(game_id),
            LoadError::Store(e) => CommandError::Store(e),
            replay @ LoadError::Replay { .. } => CommandError::InvariantViolation(replay.to_string()),
        }
    }
}

impl From<ResolveError> for CommandError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::CharacterNotFound(id) => CommandError::CharacterNotFound(id),
            ResolveError::NotAnAvailableAction => CommandError::NotAnAvailableAction,
        }
    }
}

impl From<ApplyError> for CommandError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::RoomFull(max) => CommandError::RoomFull { max },
            ApplyError::PlayerNotFound(id) => CommandError::PlayerNotFound(id),
            ApplyError::CharacterNotFound(id) => CommandError::CharacterNotFound(id),
            other => CommandError::InvariantViolation(other.to_string()),
        }
    }
}
