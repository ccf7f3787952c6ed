//! Autoignore Watcher - live ignore rules per project root
//!
//! This crate keeps an `autoignore-core` rule set in step with the rules
//! file on disk:
//! - Watching the project root for changes
//! - Reloading and swapping in a fresh rule set when the rules file changes
//! - Handing out one manager per root through a resettable registry
//!
//! # Example
//!
//! ```no_run
//! use autoignore_watcher::IgnoreRegistry;
//! use std::path::Path;
//!
//! let manager = IgnoreRegistry::global().get_instance(Path::new(".")).unwrap();
//! assert!(manager.should_ignore("node_modules/react/index.js"));
//! IgnoreRegistry::global().reset_instance(Path::new("."));
//! ```

mod error;
mod manager;
mod registry;
mod watcher;

pub use error::{Result, WatchError};
pub use manager::{IgnoreManager, ManagerState};
pub use registry::IgnoreRegistry;
pub use watcher::{ChangeEvent, ChangeKind, ChangeWatcher, EventSink, FileWatcher, ManualWatcher};

use std::path::Path;
use tracing::warn;

/// Checks `path` against the rules of the current directory's project,
/// using the global registry.
///
/// If the current directory can't be used as a root the path is not
/// ignored.
pub fn should_ignore(path: impl AsRef<Path>) -> bool {
    let root = match std::env::current_dir() {
        Ok(root) => root,
        Err(e) => {
            warn!("Can't determine current directory: {}", e);
            return false;
        }
    };

    match IgnoreRegistry::global().get_instance(&root) {
        Ok(manager) => manager.should_ignore(path),
        Err(e) => {
            warn!("No ignore rules for {}: {}", root.display(), e);
            false
        }
    }
}
