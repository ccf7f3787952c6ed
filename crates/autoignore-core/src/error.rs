//! Error types for rule loading and pattern compilation.
//!
//! Most of these never reach the caller of an ignore query. The loader
//! turns them into diagnostics and keeps going with whatever rules it
//! could build.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience type for functions that can fail while building rules.
pub type Result<T> = std::result::Result<T, IgnoreError>;

/// Things that can go wrong when building or configuring a rule set.
#[derive(Error, Debug)]
pub enum IgnoreError {
    /// Couldn't read a file (or resolve a directory) on disk.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The line looked like a pattern but the glob engine rejected it,
    /// e.g. an unclosed character class.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Nothing left after stripping `!` and slashes, e.g. a bare `!` or `/`.
    #[error("pattern '{0}' is empty after normalization")]
    EmptyPattern(String),

    /// Config file exists but isn't valid JSON for [`crate::IgnoreConfig`].
    #[error("invalid config '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl IgnoreError {
    /// Creates an IO error with the path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
