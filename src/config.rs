//! Engine Configuration
//!
//! Read once from the environment at startup.

use std::path::PathBuf;

use crate::game::actions::MAX_PLAYERS;

/// Default capacity of the change-notification channel.
pub const DEFAULT_CHANGE_FEED_CAPACITY: usize = 256;

/// Default tracing filter.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// A configuration value that cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Not a number.
    #[error("{var}: expected an integer, got {value:?}")]
    NotANumber {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Number outside the accepted range.
    #[error("{var}: {value} is outside {min}..={max}")]
    OutOfRange {
        /// Variable name
        var: &'static str,
        /// Parsed value
        value: usize,
        /// Lowest accepted
        min: usize,
        /// Highest accepted
        max: usize,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Room cap enforced by the join command (at most [`MAX_PLAYERS`]).
    pub max_players: usize,
    /// Directory for the file event store; in-memory store when `None`.
    pub event_log_dir: Option<PathBuf>,
    /// Buffered change notifications per subscriber.
    pub change_feed_capacity: usize,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            event_log_dir: None,
            change_feed_capacity: DEFAULT_CHANGE_FEED_CAPACITY,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// - `MAZE_MAX_PLAYERS`: room cap, 1..=8 (default 8)
    /// - `MAZE_EVENT_LOG_DIR`: file event store directory (default in-memory)
    /// - `MAZE_CHANGE_FEED_CAPACITY`: change feed buffer (default 256)
    /// - `MAZE_LOG`: default tracing filter (default `info`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            max_players: parse_bounded(&lookup, "MAZE_MAX_PLAYERS", defaults.max_players, 1, MAX_PLAYERS)?,
            event_log_dir: lookup("MAZE_EVENT_LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            change_feed_capacity: parse_bounded(
                &lookup,
                "MAZE_CHANGE_FEED_CAPACITY",
                defaults.change_feed_capacity,
                1,
                usize::MAX / 2,
            )?,
            log_filter: lookup("MAZE_LOG").unwrap_or(defaults.log_filter),
        })
    }
}

fn parse_bounded(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: usize,
    min: usize,
    max: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };

    let value: usize = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::NotANumber { var, value: raw.clone() })?;

    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange { var, value, min, max })
    }
}
