//! Game Repository
//!
//! Loads games by folding their streams and appends new events at an
//! expected version.

use tracing::debug;

use crate::core::ids::GameId;
use crate::game::events::GameEvent;
use crate::game::state::{ApplyError, Game};

use super::event_store::{AppendOutcome, EventStore, EventStoreError, ExpectedVersion};

/// A game could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// No stream for this id.
    #[error("Game {0} not found")]
    NotFound(GameId),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// A stored event does not fold. The log is inconsistent.
    #[error("Event {version} of game {game_id} does not apply: {source}")]
    Replay {
        /// Affected game
        game_id: GameId,
        /// Version of the offending event
        version: u64,
        /// Fold failure
        #[source]
        source: ApplyError,
    },
}

/// A freshly folded game and the stream version it reflects.
#[derive(Clone, Debug)]
pub struct LoadedGame {
    /// The aggregate
    pub game: Game,
    /// Number of events folded
    pub version: u64,
}

/// Event-sourced access to games.
#[derive(Debug, Default)]
pub struct GameRepository<S> {
    store: S,
}

impl<S: EventStore> GameRepository<S> {
    /// Wrap an event store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The decoded history of a game, in append order.
    pub async fn history(&self, game_id: GameId) -> Result<Vec<GameEvent>, LoadError> {
        let records = self.store.read_stream(game_id).await?;
        if records.is_empty() {
            return Err(LoadError::NotFound(game_id));
        }

        records
            .iter()
            .map(|r| r.decode().map_err(LoadError::from))
            .collect()
    }

    /// Rebuild a game from its full history.
    pub async fn load(&self, game_id: GameId) -> Result<LoadedGame, LoadError> {
        let history = self.history(game_id).await?;

        let mut game = Game::new(game_id);
        for (event, version) in history.iter().zip(1u64..) {
            game.apply(event)
                .map_err(|source| LoadError::Replay { game_id, version, source })?;
        }

        let version = history.len() as u64;
        debug!(%game_id, version, "Loaded game");
        Ok(LoadedGame { game, version })
    }

    /// Append events at the expected version.
    pub async fn append(
        &self,
        game_id: GameId,
        expected: ExpectedVersion,
        events: &[GameEvent],
    ) -> Result<AppendOutcome, EventStoreError> {
        self.store.append(game_id, expected, events).await
    }

    /// Every stored game id.
    pub async fn game_ids(&self) -> Result<Vec<GameId>, EventStoreError> {
        self.store.stream_ids().await
    }
}

// =============================================================================
// TESTS
// =============================================================================
