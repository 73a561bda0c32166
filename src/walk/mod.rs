//! Filesystem walking and line-count helpers
//!
//! Everything here is pure path/content manipulation; the line-count
//! threshold task composes these into its validity check.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively list all regular files under `root`. A missing or unreadable
/// root yields an empty list rather than an error.
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

/// Keep files whose path ends with `suffix` (e.g. `".go"`).
pub fn with_extension(files: Vec<PathBuf>, suffix: &str) -> Vec<PathBuf> {
    files
        .into_iter()
        .filter(|path| path.to_string_lossy().ends_with(suffix))
        .collect()
}

/// Directory components of `path` below `root`, excluding the file name.
fn ancestor_names(path: &Path, root: &Path) -> Vec<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

fn matches_any(component: &str, names: &[String]) -> bool {
    names.iter().any(|name| component.contains(name.as_str()))
}

/// Keep files with at least one ancestor directory (relative to `root`)
/// whose name contains one of `names`. An empty list keeps everything.
pub fn with_ancestor(files: Vec<PathBuf>, root: &Path, names: &[String]) -> Vec<PathBuf> {
    if names.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|path| {
            ancestor_names(path, root)
                .iter()
                .any(|component| matches_any(component, names))
        })
        .collect()
}

/// Like [`with_ancestor`], then drop files with any ancestor whose name
/// contains one of `exclude`.
pub fn without_ancestor(
    files: Vec<PathBuf>,
    root: &Path,
    names: &[String],
    exclude: &[String],
) -> Vec<PathBuf> {
    with_ancestor(files, root, names)
        .into_iter()
        .filter(|path| {
            !ancestor_names(path, root)
                .iter()
                .any(|component| matches_any(component, exclude))
        })
        .collect()
}

/// Number of lines in a file; unreadable or non-UTF-8 files count as zero.
pub fn count_lines(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/core")).unwrap();
        fs::create_dir_all(dir.path().join("vendor/lib")).unwrap();
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        fs::write(dir.path().join("src/core/a.go"), "a\nb\nc\n").unwrap();
        fs::write(dir.path().join("src/core/b.rs"), "fn b() {}\n").unwrap();
        fs::write(dir.path().join("vendor/lib/c.go"), "x\ny\n").unwrap();
        dir
    }

    #[test]
    fn test_walk_lists_only_files() {
        let dir = fixture();
        let files = walk_files(dir.path());
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_walk_missing_root_is_empty() {
        assert!(walk_files(Path::new("/nonexistent/reposift-test")).is_empty());
    }

    #[test]
    fn test_extension_filter() {
        let dir = fixture();
        let files = with_extension(walk_files(dir.path()), ".go");
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_ancestor_include() {
        let dir = fixture();
        let files = with_ancestor(
            with_extension(walk_files(dir.path()), ".go"),
            dir.path(),
            &["src".to_string()],
        );
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/core/a.go"));
    }

    #[test]
    fn test_ancestor_include_matches_substring() {
        let dir = fixture();
        let files = with_ancestor(
            walk_files(dir.path()),
            dir.path(),
            &["cor".to_string()],
        );
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_ancestor_exclude() {
        let dir = fixture();
        let files = without_ancestor(
            with_extension(walk_files(dir.path()), ".go"),
            dir.path(),
            &[],
            &["vendor".to_string()],
        );
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| !p.to_string_lossy().contains("vendor")));
    }

    #[test]
    fn test_root_level_file_has_no_ancestors() {
        let dir = fixture();
        let files = with_ancestor(
            walk_files(dir.path()),
            dir.path(),
            &["src".to_string()],
        );
        assert!(files.iter().all(|p| !p.ends_with("main.go")));
    }

    #[test]
    fn test_count_lines() {
        let dir = fixture();
        assert_eq!(count_lines(&dir.path().join("src/core/a.go")), 3);
        assert_eq!(count_lines(&dir.path().join("missing.go")), 0);
    }
}
