//! Errors from watching and managing rule sets.

use autoignore_core::IgnoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Error, Debug)]
pub enum WatchError {
    /// The notification backend refused to start or to watch the root.
    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// `start` was called on a watcher that is already delivering events.
    #[error("watcher is already running")]
    AlreadyRunning,

    /// The watch root is missing or isn't a directory.
    #[error("watch root '{0}' is not a directory")]
    NotADirectory(PathBuf),

    /// Resolving the project root failed.
    #[error(transparent)]
    Rules(#[from] IgnoreError),
}
