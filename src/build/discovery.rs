//! Source file discovery for the build.
//!
//! Expands manifest glob patterns against the asset root and combines the
//! results into the resolved file set (`inclusions - exclusions`).

use crate::build::{Manifest, ManifestLine, Polarity};
use glob::{glob_with, MatchOptions, Pattern};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error during source discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Invalid glob pattern
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// A directory entry could not be read while expanding a pattern
    #[error("Failed to read '{}' while expanding '{pattern}': {source}", path.display())]
    Unreadable {
        pattern: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Canonical form of the asset root, or the path itself while it does not exist.
pub fn canonical_root(asset_root: &Path) -> PathBuf {
    fs::canonicalize(asset_root).unwrap_or_else(|_| asset_root.to_path_buf())
}

/// Options used for every manifest pattern.
///
/// Case sensitivity follows the host filesystem, `*` never crosses a path
/// separator and only `**` recurses.
fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: !cfg!(windows),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Expand a single glob pattern relative to the asset root.
///
/// Returns the canonical paths of all matching regular files, so a file
/// reached through `..` or a symlink is the same member as its real path.
/// Directories are never part of the result and a pattern without matches
/// yields an empty set.
pub fn resolve_pattern(asset_root: &Path, pattern: &str) -> Result<BTreeSet<PathBuf>, DiscoveryError> {
    // The root itself may contain glob metacharacters
    let escaped_root = Pattern::escape(&asset_root.to_string_lossy());
    let full_pattern = Path::new(&escaped_root).join(pattern);
    let pattern_str = full_pattern.to_string_lossy();

    let paths = glob_with(&pattern_str, match_options()).map_err(|source| {
        DiscoveryError::InvalidPattern { pattern: pattern.to_string(), source }
    })?;

    let mut files = BTreeSet::new();
    for entry in paths {
        let path = entry.map_err(|e| DiscoveryError::Unreadable {
            pattern: pattern.to_string(),
            path: e.path().to_path_buf(),
            source: e.into(),
        })?;
        if path.is_file() {
            let canonical = fs::canonicalize(&path).map_err(|source| DiscoveryError::Unreadable {
                pattern: pattern.to_string(),
                path: path.clone(),
                source,
            })?;
            files.insert(canonical);
        }
    }

    Ok(files)
}

/// The files matched by a manifest, split by polarity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSets {
    /// Files matched by at least one inclusion pattern
    pub inclusions: BTreeSet<PathBuf>,
    /// Files matched by at least one exclusion pattern
    pub exclusions: BTreeSet<PathBuf>,
}

impl FileSets {
    /// Create empty file sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every manifest line against the asset root.
    pub fn collect(manifest: &Manifest, asset_root: &Path) -> Result<Self, DiscoveryError> {
        let mut sets = Self::new();
        for line in manifest.lines() {
            sets.add_line(line, asset_root)?;
        }
        Ok(sets)
    }

    /// Resolve a single manifest line into the set matching its polarity.
    pub fn add_line(&mut self, line: &ManifestLine, asset_root: &Path) -> Result<(), DiscoveryError> {
        let files = resolve_pattern(asset_root, &line.pattern)?;
        match line.polarity {
            Polarity::Include => self.inclusions.extend(files),
            Polarity::Exclude => self.exclusions.extend(files),
        }
        Ok(())
    }

    /// Apply the set algebra: every excluded file is removed, no matter how
    /// many inclusion patterns matched it.
    pub fn resolve(self) -> ResolvedFileSet {
        let files = self.inclusions.difference(&self.exclusions).cloned().collect();
        ResolvedFileSet { files }
    }
}

/// The final set of source files to process.
///
/// Iteration is always in lexicographic path order. All members share the
/// asset root prefix, so this is also the order of the relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFileSet {
    files: BTreeSet<PathBuf>,
}

impl ResolvedFileSet {
    /// Create a resolved set from an explicit list of files.
    pub fn from_files<I: IntoIterator<Item = PathBuf>>(files: I) -> Self {
        Self { files: files.into_iter().collect() }
    }

    /// Check if a file is part of the set.
    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    /// Iterate over the absolute paths in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    /// Paths relative to the asset root, in deterministic order.
    ///
    /// Files outside the root (only possible with absolute patterns) keep
    /// their absolute path.
    pub fn relative_paths(&self, asset_root: &Path) -> Vec<PathBuf> {
        let asset_root = canonical_root(asset_root);
        self.files
            .iter()
            .map(|p| p.strip_prefix(&asset_root).map(Path::to_path_buf).unwrap_or_else(|_| p.clone()))
            .collect()
    }

    /// Number of files in the set.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<'a> IntoIterator for &'a ResolvedFileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Resolve a manifest into the final file set.
pub fn resolve_manifest(manifest: &Manifest, asset_root: &Path) -> Result<ResolvedFileSet, DiscoveryError> {
    Ok(FileSets::collect(manifest, asset_root)?.resolve())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap().write_all(b"data").unwrap();
        path
    }

    fn relative(set: &ResolvedFileSet, root: &Path) -> Vec<String> {
        set.relative_paths(root).iter().map(|p| p.to_string_lossy().replace('\\', "/")).collect()
    }

    #[test]
    fn test_resolve_pattern_simple() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "maps/a.tmx");
        create_test_file(temp.path(), "maps/b.png");

        let files = resolve_pattern(temp.path(), "maps/*.tmx").unwrap();
        assert_eq!(files.len(), 1);
        assert!(files.iter().next().unwrap().ends_with("maps/a.tmx"));
        assert!(files.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_resolve_pattern_recursive() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "a.png");
        create_test_file(temp.path(), "sprites/b.png");
        create_test_file(temp.path(), "sprites/deep/c.png");

        let files = resolve_pattern(temp.path(), "**/*.png").unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_resolve_pattern_star_does_not_cross_directories() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "maps/a.tmx");
        create_test_file(temp.path(), "maps/old/b.tmx");

        let files = resolve_pattern(temp.path(), "maps/*.tmx").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_resolve_pattern_excludes_directories() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "fx/nmi.png");
        fs::create_dir_all(temp.path().join("fx/empty")).unwrap();

        let files = resolve_pattern(temp.path(), "fx/*").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_resolve_pattern_no_match() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "sprite.png");

        let files = resolve_pattern(temp.path(), "*.tmx").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_resolve_pattern_invalid() {
        let temp = TempDir::new().unwrap();
        let err = resolve_pattern(temp.path(), "maps/***.tmx").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidPattern { .. }));
        assert!(err.to_string().contains("maps/***.tmx"));
    }

    #[test]
    fn test_resolve_pattern_root_with_metacharacters() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art[v1]");
        create_test_file(&root, "maps/a.tmx");

        let files = resolve_pattern(&root, "maps/*.tmx").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "maps/a.tmx");
        create_test_file(temp.path(), "maps/debug_test.tmx");

        let manifest = Manifest::parse_str("maps/*.tmx\n-maps/debug_*.tmx\n").unwrap();
        let resolved = resolve_manifest(&manifest, temp.path()).unwrap();
        assert_eq!(relative(&resolved, temp.path()), vec!["maps/a.tmx"]);
    }

    #[test]
    fn test_resolution_independent_of_line_order() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "maps/a.tmx");
        create_test_file(temp.path(), "maps/debug_test.tmx");
        create_test_file(temp.path(), "gui/panel.png");

        let forward =
            Manifest::parse_str("maps/*.tmx\n**/*.tmx\ngui/*\n-maps/debug_*.tmx\n").unwrap();
        let backward =
            Manifest::parse_str("-maps/debug_*.tmx\ngui/*\n**/*.tmx\nmaps/*.tmx\n").unwrap();

        let a = resolve_manifest(&forward, temp.path()).unwrap();
        let b = resolve_manifest(&backward, temp.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(relative(&a, temp.path()), vec!["gui/panel.png", "maps/a.tmx"]);
    }

    #[test]
    fn test_dot_dot_path_is_same_file() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "maps/a.png");

        let manifest = Manifest::parse_str("maps/../maps/*.png\n-maps/*.png\n").unwrap();
        let resolved = resolve_manifest(&manifest, temp.path()).unwrap();
        assert!(resolved.is_empty());

        let included = resolve_manifest(&Manifest::parse_str("maps/../maps/*.png\n").unwrap(), temp.path()).unwrap();
        assert_eq!(relative(&included, temp.path()), vec!["maps/a.png"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_resolves_to_real_path() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "sprites/droid.png");
        std::os::unix::fs::symlink(temp.path().join("sprites"), temp.path().join("alias")).unwrap();

        let manifest = Manifest::parse_str("alias/*.png\n-sprites/*.png\n").unwrap();
        assert!(resolve_manifest(&manifest, temp.path()).unwrap().is_empty());

        let both = Manifest::parse_str("alias/*.png\nsprites/*.png\n").unwrap();
        let resolved = resolve_manifest(&both, temp.path()).unwrap();
        assert_eq!(relative(&resolved, temp.path()), vec!["sprites/droid.png"]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "maps/a.tmx");

        let manifest = Manifest::parse_str("maps/*.tmx\nmaps/a.tmx\n**/*.tmx\n").unwrap();
        let resolved = resolve_manifest(&manifest, temp.path()).unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn test_file_sets_collect() {
        let temp = TempDir::new().unwrap();
        create_test_file(temp.path(), "a.txt");
        create_test_file(temp.path(), "b.txt");

        let manifest = Manifest::parse_str("*.txt\n-b.txt\n-missing/*\n").unwrap();
        let sets = FileSets::collect(&manifest, temp.path()).unwrap();
        assert_eq!(sets.inclusions.len(), 2);
        assert_eq!(sets.exclusions.len(), 1);
        assert_eq!(sets.resolve().len(), 1);
    }

    #[test]
    fn test_resolved_iteration_is_sorted() {
        let set = ResolvedFileSet::from_files(vec![
            PathBuf::from("/art/b/z.png"),
            PathBuf::from("/art/a.png"),
            PathBuf::from("/art/b/a.png"),
        ]);
        let order: Vec<_> = set.iter().cloned().collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/art/a.png"),
                PathBuf::from("/art/b/a.png"),
                PathBuf::from("/art/b/z.png"),
            ]
        );
    }
}
