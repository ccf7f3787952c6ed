//! Rule loading.
//!
//! Reads the rules file for a root and merges it with the always-on
//! defaults. Loading never fails: a missing file means defaults only, an
//! unreadable file means defaults only plus a warning, and a bad line is
//! skipped on its own.

use crate::config::IgnoreConfig;
use crate::error::{IgnoreError, Result};
use crate::pattern::{Pattern, PatternOrigin};
use crate::ruleset::{Diagnostic, RuleSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Builds [`RuleSet`]s for a root according to an [`IgnoreConfig`].
#[derive(Debug, Clone, Default)]
pub struct RuleSetLoader {
    config: IgnoreConfig,
}

impl RuleSetLoader {
    pub fn new(config: IgnoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IgnoreConfig {
        &self.config
    }

    /// Where the rules file for `root` is (or would be).
    pub fn rules_file_path(&self, root: &Path) -> PathBuf {
        self.config.rules_file_path(root)
    }

    /// Loads the rule set for `root`.
    pub fn load(&self, root: &Path) -> RuleSet {
        let mut patterns = self.default_patterns();
        let mut diagnostics = Vec::new();
        let rules_file = self.rules_file_path(root);

        let ruleset = match read_rules_file(&rules_file) {
            Ok(Some(text)) => {
                let (user, skipped) = parse_rules(&text);
                for d in &skipped {
                    warn!("{}: {}", rules_file.display(), d);
                }
                debug!(
                    "Loaded {} user patterns from {}",
                    user.len(),
                    rules_file.display()
                );
                patterns.extend(user);
                diagnostics.extend(skipped);
                RuleSet::new(root, patterns).with_source(&rules_file)
            }
            Ok(None) => {
                debug!(
                    "No rules file at {}, using defaults only",
                    rules_file.display()
                );
                RuleSet::new(root, patterns)
            }
            Err(e) => {
                warn!("{}, falling back to default excludes", e);
                diagnostics.push(Diagnostic::RulesFileUnreadable {
                    path: rules_file.clone(),
                    reason: e.to_string(),
                });
                RuleSet::new(root, patterns)
            }
        };

        ruleset.with_diagnostics(diagnostics)
    }

    fn default_patterns(&self) -> Vec<Pattern> {
        let mut patterns = Vec::new();
        for line in self.config.default_patterns() {
            match Pattern::compile(line, PatternOrigin::Default) {
                Ok(Some(p)) => patterns.push(p),
                Ok(None) => {}
                Err(e) => warn!("Skipping default exclude: {}", e),
            }
        }
        patterns
    }
}

/// Compiles rules-file text into user patterns.
///
/// Returns the patterns in file order together with a diagnostic for every
/// line that had to be skipped. Line numbers are 1-based.
pub fn parse_rules(text: &str) -> (Vec<Pattern>, Vec<Diagnostic>) {
    let mut patterns = Vec::new();
    let mut skipped = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        match Pattern::compile(line, PatternOrigin::User) {
            Ok(Some(p)) => patterns.push(p.with_line(idx + 1)),
            Ok(None) => {}
            Err(e) => skipped.push(Diagnostic::MalformedPattern {
                line: idx + 1,
                text: line.trim().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    (patterns, skipped)
}

/// Reads the rules file as UTF-8. `Ok(None)` if it doesn't exist.
fn read_rules_file(path: &Path) -> Result<Option<String>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(IgnoreError::io(path, e)),
    };

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| IgnoreError::io(path, std::io::Error::new(ErrorKind::InvalidData, e)))
}
