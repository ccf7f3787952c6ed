//! Rule sets - the immutable snapshot every ignore query runs against.

use crate::path::{ancestors, normalize_relative};
use crate::pattern::{Pattern, PatternOrigin};
use std::fmt;
use std::path::{Path, PathBuf};

/// Something that went wrong while loading, kept for later inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The rules file exists but couldn't be read or wasn't UTF-8.
    RulesFileUnreadable { path: PathBuf, reason: String },
    /// A single line was skipped.
    MalformedPattern {
        line: usize,
        text: String,
        reason: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::RulesFileUnreadable { path, reason } => {
                write!(f, "rules file '{}' unreadable: {}", path.display(), reason)
            }
            Diagnostic::MalformedPattern { line, text, reason } => {
                write!(f, "line {}: skipped '{}': {}", line, text, reason)
            }
        }
    }
}

/// An ordered, immutable collection of patterns for one root.
///
/// Defaults come first and user patterns after them. When several
/// patterns match the same path the last one wins, so a user `!pattern`
/// can re-include something a default excluded.
#[derive(Debug, Clone)]
pub struct RuleSet {
    root: PathBuf,
    patterns: Vec<Pattern>,
    source: Option<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl RuleSet {
    pub fn new(root: impl Into<PathBuf>, patterns: Vec<Pattern>) -> Self {
        Self {
            root: root.into(),
            patterns,
            source: None,
            diagnostics: Vec::new(),
        }
    }

    /// Records the rules file the user patterns were read from.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Decides whether a root-relative path is ignored.
    ///
    /// Every ancestor directory is checked first: once a directory is
    /// ignored, everything below it is too, whatever the later patterns
    /// say about the descendant itself. Paths that climb out of the root
    /// and the root itself are never ignored.
    pub fn is_ignored(&self, relative_path: &str, is_dir: bool) -> bool {
        self.matching_pattern(relative_path, is_dir)
            .map(|p| !p.is_negation())
            .unwrap_or(false)
    }

    /// The pattern responsible for the decision on `relative_path`, if any.
    ///
    /// For a path under an ignored directory this is the pattern that
    /// ignored the directory. A negation pattern in the result means the
    /// path was explicitly re-included.
    pub fn matching_pattern(&self, relative_path: &str, is_dir: bool) -> Option<&Pattern> {
        let path = normalize_relative(relative_path)?;
        if path.is_empty() {
            return None;
        }

        for dir in ancestors(&path) {
            if let Some(p) = self.last_match(dir, true) {
                if !p.is_negation() {
                    return Some(p);
                }
            }
        }

        self.last_match(&path, is_dir)
    }

    fn last_match(&self, path: &str, is_dir: bool) -> Option<&Pattern> {
        self.patterns.iter().rev().find(|p| p.matches(path, is_dir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Only the patterns that came from the rules file.
    pub fn user_patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns
            .iter()
            .filter(|p| p.origin() == PatternOrigin::User)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruleset(defaults: &[&str], user: &[&str]) -> RuleSet {
        let compile = |line: &&str, origin| Pattern::compile(line, origin).unwrap().unwrap();
        let patterns = defaults
            .iter()
            .map(|l| compile(l, PatternOrigin::Default))
            .chain(user.iter().map(|l| compile(l, PatternOrigin::User)))
            .collect();
        RuleSet::new("/project", patterns)
    }

    #[test]
    fn test_ignored_directory_propagates_to_descendants() {
        let rules = ruleset(&["node_modules"], &["custom_ignored/"]);

        assert!(rules.is_ignored("node_modules", true));
        assert!(rules.is_ignored("node_modules/package.json", false));
        assert!(rules.is_ignored("node_modules/a/b/c/index.js", false));

        // Dir-only pattern can't match the file itself, only its parent
        assert!(rules.is_ignored("custom_ignored/ignored.txt", false));
        assert!(rules.is_ignored("custom_ignored/deeper/x.txt", false));
        assert!(!rules.is_ignored("not_ignored/not_ignored.txt", false));
    }

    #[test]
    fn test_descendants_ignored_even_without_own_match() {
        let rules = ruleset(&[], &["/generated"]);
        for path in ["generated/a.rs", "generated/x/y/z.txt", "generated/.keep"] {
            assert!(rules.is_ignored(path, false), "{path}");
        }
        assert!(!rules.is_ignored("src/generated/a.rs", false));
    }

    #[test]
    fn test_last_match_wins_with_negation() {
        let rules = ruleset(&[], &["*.log", "!keep.log"]);
        assert!(rules.is_ignored("debug.log", false));
        assert!(!rules.is_ignored("keep.log", false));
        assert!(!rules.is_ignored("logs/keep.log", false));

        // Order matters: a later positive pattern re-ignores
        let rules = ruleset(&[], &["!keep.log", "*.log"]);
        assert!(rules.is_ignored("keep.log", false));
    }

    #[test]
    fn test_user_negation_can_override_default() {
        let rules = ruleset(&["build"], &["!build"]);
        assert!(!rules.is_ignored("build/output.txt", false));
        assert!(!rules.is_ignored("build", true));
    }

    #[test]
    fn test_negation_cannot_reinclude_under_ignored_directory() {
        let rules = ruleset(&["node_modules"], &["!node_modules/keep.js"]);
        assert!(rules.is_ignored("node_modules/keep.js", false));
    }

    #[test]
    fn test_anchored_and_unanchored_follow_file_order() {
        // Unanchored exclude, anchored re-include: the later line wins
        let rules = ruleset(&[], &["*.md", "!/README.md"]);
        assert!(!rules.is_ignored("README.md", false));
        assert!(rules.is_ignored("docs/README.md", false));

        // Reversed: unanchored line comes last and wins everywhere
        let rules = ruleset(&[], &["!/README.md", "*.md"]);
        assert!(rules.is_ignored("README.md", false));
    }

    #[test]
    fn test_root_and_escaping_paths_are_not_ignored() {
        let rules = ruleset(&["*"], &[]);
        assert!(!rules.is_ignored("", true));
        assert!(!rules.is_ignored(".", true));
        assert!(!rules.is_ignored("../elsewhere/file", false));
    }

    #[test]
    fn test_paths_are_normalized_before_matching() {
        let rules = ruleset(&["node_modules"], &[]);
        assert!(rules.is_ignored("node_modules\\pkg\\index.js", false));
        assert!(rules.is_ignored("./src/../node_modules/x", false));
    }

    #[test]
    fn test_matching_pattern_reports_ancestor() {
        let rules = ruleset(&["node_modules"], &["*.log"]);
        let p = rules
            .matching_pattern("node_modules/pkg/debug.log", false)
            .unwrap();
        assert_eq!(p.raw(), "node_modules");
        assert_eq!(p.origin(), PatternOrigin::Default);
        assert!(rules.matching_pattern("src/main.rs", false).is_none());
    }

    #[test]
    fn test_user_patterns_filter() {
        let rules = ruleset(&[".git", "dist"], &["*.log"]);
        let user: Vec<_> = rules.user_patterns().map(|p| p.raw()).collect();
        assert_eq!(user, vec!["*.log"]);
        assert_eq!(rules.len(), 3);
    }
}
