//! Event Log
//!
//! Append-only, per-game event streams with optimistic concurrency. The log
//! is the single source of truth; every game is rebuilt by folding its
//! stream.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::core::ids::GameId;
use crate::game::events::GameEvent;

/// Errors that can occur in the event store.
#[derive(Debug, thiserror::Error)]
pub enum EventStoreError {
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or payload could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record carries a kind tag this build does not know.
    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    /// A stored stream is not a contiguous, well-formed history.
    #[error("Corrupt event stream {game_id}: {reason}")]
    Corrupt {
        /// Affected stream
        game_id: GameId,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

// =============================================================================
// RECORDS
// =============================================================================

/// One persisted event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Owning stream
    pub game_id: GameId,

    /// Stream version after this event (first event is 1)
    pub version: u64,

    /// Event kind tag
    pub kind: String,

    /// Event payload, without the tag
    pub payload: serde_json::Value,

    /// When the record was appended (metadata, never folded)
    pub recorded_at: DateTime<Utc>,
}

impl EventRecord {
    /// Encode `event` as the record at `version` of `game_id`.
    pub fn encode(game_id: GameId, version: u64, event: &GameEvent) -> Result<Self> {
        let mut tagged = serde_json::to_value(event)?;
        let payload = tagged
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);

        Ok(Self {
            game_id,
            version,
            kind: event.kind().to_string(),
            payload,
            recorded_at: Utc::now(),
        })
    }

    /// Decode the event. The kind tag must be known and must match the payload.
    pub fn decode(&self) -> Result<GameEvent> {
        if !GameEvent::KINDS.contains(&self.kind.as_str()) {
            return Err(EventStoreError::UnknownKind(self.kind.clone()));
        }

        let tagged = serde_json::json!({ "kind": self.kind, "payload": self.payload });
        Ok(serde_json::from_value(tagged)?)
    }
}

// =============================================================================
// CONCURRENCY
// =============================================================================

/// The stream position a writer believes is current.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// The stream must not exist yet
    NoStream,
    /// The stream must hold exactly this many events
    Exact(u64),
}

/// Result of an append attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppendOutcome {
    /// Written; the stream is now at `version`
    Applied {
        /// New stream version
        version: u64,
    },
    /// Another writer got there first
    Conflict {
        /// Actual stream version
        current: u64,
    },
    /// Expected an existing stream, found none
    NotFound,
}

/// Decide whether an append may proceed against a stream at `current`
/// (`None` when the stream does not exist). `None` means proceed.
fn check_expected(current: Option<u64>, expected: ExpectedVersion) -> Option<AppendOutcome> {
    match (current, expected) {
        (None, ExpectedVersion::NoStream) => None,
        (None, ExpectedVersion::Exact(_)) => Some(AppendOutcome::NotFound),
        (Some(current), ExpectedVersion::NoStream) => Some(AppendOutcome::Conflict { current }),
        (Some(current), ExpectedVersion::Exact(expected)) if current != expected => {
            Some(AppendOutcome::Conflict { current })
        }
        (Some(_), ExpectedVersion::Exact(_)) => None,
    }
}

fn encode_batch(game_id: GameId, start: u64, events: &[GameEvent]) -> Result<Vec<EventRecord>> {
    events
        .iter()
        .zip(start + 1..)
        .map(|(event, version)| EventRecord::encode(game_id, version, event))
        .collect()
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Trait for event storage backends.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All records of a stream in append order. Empty when it does not exist.
    async fn read_stream(&self, game_id: GameId) -> Result<Vec<EventRecord>>;

    /// Append `events` atomically if the stream is at `expected`.
    async fn append(
        &self,
        game_id: GameId,
        expected: ExpectedVersion,
        events: &[GameEvent],
    ) -> Result<AppendOutcome>;

    /// Ids of every existing stream, ascending.
    async fn stream_ids(&self) -> Result<Vec<GameId>>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// In-memory event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<BTreeMap<GameId, Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn read_stream(&self, game_id: GameId) -> Result<Vec<EventRecord>> {
        let streams = self.streams.read().await;
        Ok(streams.get(&game_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        game_id: GameId,
        expected: ExpectedVersion,
        events: &[GameEvent],
    ) -> Result<AppendOutcome> {
        let mut streams = self.streams.write().await;
        let current = streams.get(&game_id).map(|s| s.len() as u64);

        if let Some(rejected) = check_expected(current, expected) {
            debug!(?rejected, "Append rejected");
            return Ok(rejected);
        }

        let start = current.unwrap_or(0);
        if events.is_empty() {
            return Ok(AppendOutcome::Applied { version: start });
        }

        let records = encode_batch(game_id, start, events)?;
        let stream = streams.entry(game_id).or_default();
        stream.extend(records);

        Ok(AppendOutcome::Applied { version: stream.len() as u64 })
    }

    async fn stream_ids(&self) -> Result<Vec<GameId>> {
        Ok(self.streams.read().await.keys().copied().collect())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// File-based event store: one append-only JSON-lines file per game.
///
/// Streams are cached in memory; appends are checked and written under a
/// single write lock.
#[derive(Debug)]
pub struct FileEventStore {
    dir: PathBuf,
    streams: RwLock<BTreeMap<GameId, Vec<EventRecord>>>,
}

const STREAM_EXTENSION: &str = "jsonl";

impl FileEventStore {
    /// Creates or opens a store rooted at `dir`, loading every stream in it.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or a stream file
    /// cannot be read or is malformed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let mut streams = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(STREAM_EXTENSION) {
                continue;
            }
            let Some(game_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<GameId>().ok())
            else {
                warn!(path = %path.display(), "Skipping file with non-game-id name");
                continue;
            };

            let records = Self::load_stream(&path, game_id).await?;
            streams.insert(game_id, records);
        }

        info!(dir = %dir.display(), streams = streams.len(), "Opened file event store");

        Ok(Self {
            dir,
            streams: RwLock::new(streams),
        })
    }

    async fn load_stream(path: &Path, game_id: GameId) -> Result<Vec<EventRecord>> {
        let content = tokio::fs::read_to_string(path).await?;
        let records = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<Vec<EventRecord>, _>>()?;

        for (record, expected) in records.iter().zip(1u64..) {
            if record.game_id != game_id || record.version != expected {
                return Err(EventStoreError::Corrupt {
                    game_id,
                    reason: format!(
                        "record {} of stream {} found where version {expected} was expected",
                        record.version, record.game_id
                    ),
                });
            }
        }

        Ok(records)
    }

    /// Directory holding the stream files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn stream_path(&self, game_id: GameId) -> PathBuf {
        self.dir.join(format!("{game_id}.{STREAM_EXTENSION}"))
    }
}

#[async_trait]
impl EventStore for FileEventStore {
    async fn read_stream(&self, game_id: GameId) -> Result<Vec<EventRecord>> {
        let streams = self.streams.read().await;
        Ok(streams.get(&game_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        game_id: GameId,
        expected: ExpectedVersion,
        events: &[GameEvent],
    ) -> Result<AppendOutcome> {
        let mut streams = self.streams.write().await;
        let current = streams.get(&game_id).map(|s| s.len() as u64);

        if let Some(rejected) = check_expected(current, expected) {
            debug!(?rejected, "Append rejected");
            return Ok(rejected);
        }

        let start = current.unwrap_or(0);
        if events.is_empty() {
            return Ok(AppendOutcome::Applied { version: start });
        }

        let records = encode_batch(game_id, start, events)?;
        let mut lines = String::new();
        for record in &records {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.stream_path(game_id))
            .await?;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;

        let stream = streams.entry(game_id).or_default();
        stream.extend(records);

        Ok(AppendOutcome::Applied { version: stream.len() as u64 })
    }

    async fn stream_ids(&self) -> Result<Vec<GameId>> {
        Ok(self.streams.read().await.keys().copied().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
