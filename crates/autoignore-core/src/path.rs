//! Root-relative path normalization.
//!
//! Rules are always evaluated against a forward-slash path relative to
//! the project root, so the same rule set behaves identically wherever
//! the project happens to be mounted.

use std::path::{Component, Path};

/// Normalizes a root-relative path to `a/b/c` form.
///
/// Backslashes become slashes, empty and `.` segments are dropped and `..`
/// is resolved lexically. Returns `None` if the path climbs above the root.
/// The root itself normalizes to an empty string.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(|c| c == '/' || c == '\\') {
        match segment {
            "" | "." => continue,
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

/// Lexically resolves `path` against `root`, without touching the disk.
///
/// Returns `None` when `path` does not live under `root`.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop()?;
            }
            _ => {}
        }
    }
    Some(parts.join("/"))
}

/// Splits a normalized path into its ancestor directories, shallowest first.
///
/// `a/b/c` yields `a` and `a/b`; the path itself is not included.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').map(move |(idx, _)| &path[..idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_separators_and_dots() {
        assert_eq!(normalize_relative("a\\b\\c.txt").unwrap(), "a/b/c.txt");
        assert_eq!(normalize_relative("./a//b/./c/").unwrap(), "a/b/c");
        assert_eq!(normalize_relative("a/b/../c").unwrap(), "a/c");
        assert_eq!(normalize_relative("").unwrap(), "");
    }

    #[test]
    fn test_normalize_rejects_escape() {
        assert!(normalize_relative("../outside").is_none());
        assert!(normalize_relative("a/../../b").is_none());
    }

    #[test]
    fn test_relative_to_root() {
        let root = Path::new("/work/project");
        assert_eq!(
            relative_to(root, Path::new("/work/project/src/main.rs")).unwrap(),
            "src/main.rs"
        );
        assert_eq!(relative_to(root, root).unwrap(), "");
        assert!(relative_to(root, Path::new("/work/other/file")).is_none());
    }

    #[test]
    fn test_ancestors_shallowest_first() {
        let all: Vec<_> = ancestors("a/b/c.txt").collect();
        assert_eq!(all, vec!["a", "a/b"]);
        assert_eq!(ancestors("file.txt").count(), 0);
    }
}
