//! Pattern compilation - one rules-file line into one predicate.
//!
//! The syntax is the familiar ignore-file subset:
//! - `name` or `*.ext` matches a path component at any depth
//! - a trailing `/` only matches directories
//! - a `/` anywhere else anchors the pattern to the root
//! - a leading `!` re-includes whatever the pattern matches
//!
//! Globbing itself is delegated to `globset` with `literal_separator`
//! enabled, so `*` never crosses a `/` and `**` behaves as usual.

use crate::error::{IgnoreError, Result};
use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a pattern came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternOrigin {
    /// Built-in or configured always-on exclude.
    Default,
    /// A line in the project's rules file.
    User,
}

impl fmt::Display for PatternOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternOrigin::Default => write!(f, "default"),
            PatternOrigin::User => write!(f, "user"),
        }
    }
}

/// A single compiled rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    glob: String,
    dir_only: bool,
    negated: bool,
    anchored: bool,
    origin: PatternOrigin,
    line: Option<usize>,
    matcher: GlobMatcher,
}

impl Pattern {
    /// Compiles one line.
    ///
    /// Blank lines and `#` comments yield `Ok(None)`. Lines that can't be
    /// turned into a glob yield an error so the caller can skip them.
    pub fn compile(line: &str, origin: PatternOrigin) -> Result<Option<Self>> {
        let raw = line.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return Ok(None);
        }

        let (negated, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let dir_only = body.ends_with('/');
        let body = body.trim_end_matches('/');
        let anchored = body.contains('/');
        let glob = body.trim_start_matches('/');

        if glob.is_empty() {
            return Err(IgnoreError::EmptyPattern(raw.to_string()));
        }

        let matcher = GlobBuilder::new(glob)
            .literal_separator(true)
            .build()
            .map_err(|source| IgnoreError::InvalidPattern {
                pattern: raw.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Some(Self {
            raw: raw.to_string(),
            glob: glob.to_string(),
            dir_only,
            negated,
            anchored,
            origin,
            line: None,
            matcher,
        }))
    }

    /// Records the 1-based line this pattern was read from.
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Tests a normalized root-relative path.
    ///
    /// Anchored patterns see the whole path; unanchored ones only see the
    /// final component, which is what makes them match at any depth.
    pub fn matches(&self, relative_path: &str, is_dir: bool) -> bool {
        if self.dir_only && !is_dir {
            return false;
        }
        let candidate = if self.anchored {
            relative_path
        } else {
            relative_path.rsplit('/').next().unwrap_or(relative_path)
        };
        self.matcher.is_match(candidate)
    }

    /// The trimmed line as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The glob actually handed to the matcher.
    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn is_dir_only(&self) -> bool {
        self.dir_only
    }

    pub fn is_negation(&self) -> bool {
        self.negated
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn origin(&self) -> PatternOrigin {
        self.origin
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(line: &str) -> Pattern {
        Pattern::compile(line, PatternOrigin::User)
            .unwrap()
            .expect("line should compile to a pattern")
    }

    #[test]
    fn test_blank_and_comment_lines_are_skipped() {
        assert!(Pattern::compile("", PatternOrigin::User).unwrap().is_none());
        assert!(Pattern::compile("   ", PatternOrigin::User).unwrap().is_none());
        assert!(Pattern::compile("# build output", PatternOrigin::User)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_extension_glob_matches_any_depth() {
        let p = user("*.log");
        assert!(p.matches("debug.log", false));
        assert!(p.matches("logs/2024/app.log", false));
        assert!(!p.matches("logs/app.txt", false));
        assert!(!p.is_anchored());
    }

    #[test]
    fn test_plain_name_matches_any_component() {
        let p = user("cache");
        assert!(p.matches("cache", true));
        assert!(p.matches("src/cache", true));
        assert!(p.matches("src/cache", false));
        assert!(!p.matches("src/cache.rs", false));
    }

    #[test]
    fn test_trailing_slash_is_directory_only() {
        let p = user("custom_ignored/");
        assert!(p.is_dir_only());
        assert!(!p.is_anchored());
        assert!(p.matches("custom_ignored", true));
        assert!(p.matches("nested/custom_ignored", true));
        assert!(!p.matches("custom_ignored", false));
    }

    #[test]
    fn test_inner_slash_anchors_to_root() {
        let p = user("docs/generated");
        assert!(p.is_anchored());
        assert!(p.matches("docs/generated", true));
        assert!(!p.matches("site/docs/generated", true));
    }

    #[test]
    fn test_leading_slash_anchors_to_root() {
        let p = user("/TODO.md");
        assert_eq!(p.glob(), "TODO.md");
        assert!(p.matches("TODO.md", false));
        assert!(!p.matches("notes/TODO.md", false));
    }

    #[test]
    fn test_star_does_not_cross_separator() {
        let p = user("src/*.rs");
        assert!(p.matches("src/lib.rs", false));
        assert!(!p.matches("src/bin/main.rs", false));

        let deep = user("src/**/*.rs");
        assert!(deep.matches("src/bin/main.rs", false));
    }

    #[test]
    fn test_negation_is_recorded() {
        let p = user("!keep.log");
        assert!(p.is_negation());
        assert_eq!(p.glob(), "keep.log");
        assert!(p.matches("keep.log", false));
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let err = Pattern::compile("[abc", PatternOrigin::User).unwrap_err();
        assert!(matches!(err, IgnoreError::InvalidPattern { .. }));
    }

    #[test]
    fn test_bare_operators_are_empty_patterns() {
        for line in ["!", "/", "!/"] {
            let err = Pattern::compile(line, PatternOrigin::User).unwrap_err();
            assert!(matches!(err, IgnoreError::EmptyPattern(_)), "{line}");
        }
    }
}
