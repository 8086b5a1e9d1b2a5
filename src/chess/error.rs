use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The source produced no game with headers or moves.
    #[error("no valid game found in {origin}")]
    Parse { origin: String },

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Metadata refers to board state that does not exist (e.g. an arrow from an empty square).
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("invalid diagram anchor '{0}' (expected e.g. '3w' or '10b')")]
    InvalidAnchor(String),

    #[error("invalid render configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-game problems that were recovered from while building the move tree.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics(Vec<String>);

impl Diagnostics {
    pub fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    /// Joins everything collected so far with `"; "` and leaves the list empty.
    pub fn take(&mut self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let joined = self.0.join("; ");
        self.0.clear();
        Some(joined)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
