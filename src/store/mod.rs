//! Event Log Module
//!
//! Persistence of game histories. Non-deterministic (timestamps, I/O);
//! nothing here is ever folded into a game.
//!
//! - `event_store`: Records, expected versions, in-memory and file stores
//! - `repository`: Load-by-fold and append-at-version

pub mod event_store;
pub mod repository;

pub use event_store::{
    AppendOutcome, EventRecord, EventStore, EventStoreError, ExpectedVersion, FileEventStore,
    InMemoryEventStore,
};
pub use repository::{GameRepository, LoadError, LoadedGame};
