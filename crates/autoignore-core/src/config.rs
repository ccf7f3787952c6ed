//! Configuration and the built-in exclusion list.

use crate::error::{IgnoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directories that are excluded no matter what the rules file says.
///
/// These are plain names, so each one matches at any depth under the root.
/// They are active whether or not a rules file exists. The only way to
/// drop them wholesale is an explicit `use_default_excludes: false` in
/// [`IgnoreConfig`]; a config file that doesn't mention the key keeps them.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".auto-coder",
    "node_modules",
    ".mvn",
    ".idea",
    "__pycache__",
    ".venv",
    "venv",
    "dist",
    "build",
    ".gradle",
    ".next",
];

/// Name of the per-project rules file.
pub const RULES_FILE_NAME: &str = ".autocoderignore";

/// Directory checked for the rules file when the root has none.
pub const FALLBACK_DIR: &str = ".auto-coder";

/// Settings for locating and building rule sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// File name of the rules file, looked up directly under the root.
    pub rules_file_name: String,

    /// Directory under the root that may hold the rules file instead.
    pub fallback_dir: Option<String>,

    /// Include [`DEFAULT_EXCLUDES`] ahead of everything else. On by default;
    /// turning it off departs from the always-on exclusion list.
    pub use_default_excludes: bool,

    /// Extra always-on patterns, evaluated right after the built-in ones.
    pub extra_excludes: Vec<String>,

    /// Reload automatically when the rules file changes.
    pub watch: bool,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            rules_file_name: RULES_FILE_NAME.to_string(),
            fallback_dir: Some(FALLBACK_DIR.to_string()),
            use_default_excludes: true,
            extra_excludes: Vec::new(),
            watch: true,
        }
    }
}

impl IgnoreConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| IgnoreError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| IgnoreError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The always-on patterns, in evaluation order.
    pub fn default_patterns(&self) -> Vec<&str> {
        let builtin: &[&str] = if self.use_default_excludes {
            DEFAULT_EXCLUDES
        } else {
            &[]
        };
        builtin
            .iter()
            .copied()
            .chain(self.extra_excludes.iter().map(String::as_str))
            .collect()
    }

    /// Places the rules file may live, in lookup order.
    pub fn rules_file_candidates(&self, root: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![root.join(&self.rules_file_name)];
        if let Some(dir) = &self.fallback_dir {
            candidates.push(root.join(dir).join(&self.rules_file_name));
        }
        candidates
    }

    /// The rules file that should be read for `root`.
    ///
    /// The first candidate that exists wins. If none exist, the primary
    /// location is returned so callers know where to create one.
    pub fn rules_file_path(&self, root: &Path) -> PathBuf {
        let candidates = self.rules_file_candidates(root);
        candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .unwrap_or_else(|| root.join(&self.rules_file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_patterns_include_builtins_then_extras() {
        let config = IgnoreConfig {
            extra_excludes: vec!["target".into()],
            ..Default::default()
        };
        let patterns = config.default_patterns();
        assert_eq!(patterns[0], ".git");
        assert_eq!(*patterns.last().unwrap(), "target");
        assert_eq!(patterns.len(), DEFAULT_EXCLUDES.len() + 1);
    }

    #[test]
    fn test_builtins_can_be_disabled() {
        let config = IgnoreConfig {
            use_default_excludes: false,
            ..Default::default()
        };
        assert!(config.default_patterns().is_empty());
    }

    #[test]
    fn test_config_file_without_key_keeps_builtins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ignore.json");
        fs::write(&path, r#"{ "watch": false }"#).unwrap();

        let config = IgnoreConfig::from_file(&path).unwrap();
        assert!(config.use_default_excludes);
        assert_eq!(config.default_patterns(), DEFAULT_EXCLUDES.to_vec());
    }

    #[test]
    fn test_rules_file_prefers_root_then_fallback() {
        let dir = tempdir().unwrap();
        let config = IgnoreConfig::default();

        // Nothing exists yet: primary location
        assert_eq!(
            config.rules_file_path(dir.path()),
            dir.path().join(".autocoderignore")
        );

        let fallback = dir.path().join(".auto-coder");
        fs::create_dir(&fallback).unwrap();
        fs::write(fallback.join(".autocoderignore"), "*.tmp\n").unwrap();
        assert_eq!(
            config.rules_file_path(dir.path()),
            fallback.join(".autocoderignore")
        );

        fs::write(dir.path().join(".autocoderignore"), "*.log\n").unwrap();
        assert_eq!(
            config.rules_file_path(dir.path()),
            dir.path().join(".autocoderignore")
        );
    }

    #[test]
    fn test_from_file_fills_missing_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ignore.json");
        fs::write(&path, r#"{ "extra_excludes": ["target"], "watch": false }"#).unwrap();

        let config = IgnoreConfig::from_file(&path).unwrap();
        assert_eq!(config.rules_file_name, ".autocoderignore");
        assert_eq!(config.extra_excludes, vec!["target".to_string()]);
        assert!(!config.watch);
    }

    #[test]
    fn test_from_file_rejects_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ignore.json");
        fs::write(&path, "{ not json").unwrap();

        let err = IgnoreConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, IgnoreError::Config { .. }));
    }
}
