//! Autoignore Core - ignore patterns and rule evaluation
//!
//! This crate decides whether a path inside a project should be skipped.
//! It compiles gitignore-style lines from the project's `.autocoderignore`
//! file, puts them behind a fixed list of default excludes, and answers
//! queries against root-relative paths.
//!
//! Live reloading lives in `autoignore-watcher`; everything here is
//! synchronous and immutable once built.
//!
//! # Example
//!
//! ```no_run
//! use autoignore_core::RuleSetLoader;
//! use std::path::Path;
//!
//! let rules = RuleSetLoader::default().load(Path::new("."));
//! if rules.is_ignored("node_modules/left-pad/index.js", false) {
//!     println!("skipping");
//! }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod path;
pub mod pattern;
pub mod ruleset;

pub use config::{IgnoreConfig, DEFAULT_EXCLUDES, FALLBACK_DIR, RULES_FILE_NAME};
pub use error::{IgnoreError, Result};
pub use loader::{parse_rules, RuleSetLoader};
pub use path::{normalize_relative, relative_to};
pub use pattern::{Pattern, PatternOrigin};
pub use ruleset::{Diagnostic, RuleSet};
