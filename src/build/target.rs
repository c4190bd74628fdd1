//! Build target definitions.
//!
//! A [`CompiledAsset`] is one unit of work in a build: a resolved source file,
//! where its output goes, and how it gets there.

use std::path::{Path, PathBuf};

/// How a source asset is turned into its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Tile map, handled by the map compiler
    CompileMap,
    /// Structured puzzle, handled by the puzzle compiler
    CompilePuzzle,
    /// Puzzle index, handled by the puzzle list compiler
    CompilePuzzleList,
    /// Anything else, copied byte for byte
    CopyVerbatim,
}

impl Disposition {
    /// Check if this disposition runs a compiler.
    pub fn is_compiled(&self) -> bool {
        !matches!(self, Disposition::CopyVerbatim)
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::CompileMap => write!(f, "map"),
            Disposition::CompilePuzzle => write!(f, "puzzle"),
            Disposition::CompilePuzzleList => write!(f, "puzzle-list"),
            Disposition::CopyVerbatim => write!(f, "copy"),
        }
    }
}

/// A resolved source file paired with its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledAsset {
    /// Absolute path of the source file
    pub source: PathBuf,
    /// Output path relative to the target directory
    pub destination: PathBuf,
    /// Which handler produces the output
    pub disposition: Disposition,
}

impl CompiledAsset {
    /// Create a new compiled asset entry.
    pub fn new(source: PathBuf, destination: PathBuf, disposition: Disposition) -> Self {
        Self { source, destination, disposition }
    }

    /// Identifier used in diagnostics (the destination path with `/` separators).
    pub fn id(&self) -> String {
        self.destination.to_string_lossy().replace('\\', "/")
    }

    /// Absolute output path inside the given target directory.
    pub fn output_path(&self, target_dir: &Path) -> PathBuf {
        target_dir.join(&self.destination)
    }
}

/// The ordered list of assets a build will produce.
///
/// Entries keep the order they were added in, which the dispatcher derives
/// from the sorted resolved file set.
#[derive(Debug, Default, Clone)]
pub struct BuildPlan {
    assets: Vec<CompiledAsset>,
}

impl BuildPlan {
    /// Create a new empty build plan.
    pub fn new() -> Self {
        Self { assets: vec![] }
    }

    /// Add an asset to the plan.
    pub fn add_asset(&mut self, asset: CompiledAsset) {
        self.assets.push(asset);
    }

    /// Get all assets in the plan.
    pub fn assets(&self) -> &[CompiledAsset] {
        &self.assets
    }

    /// Get the number of assets in the plan.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Number of assets handled with the given disposition.
    pub fn count(&self, disposition: Disposition) -> usize {
        self.assets.iter().filter(|a| a.disposition == disposition).count()
    }

    /// Find the entry for a destination path.
    pub fn find(&self, destination: &Path) -> Option<&CompiledAsset> {
        self.assets.iter().find(|a| a.destination == destination)
    }
}

impl<'a> IntoIterator for &'a BuildPlan {
    type Item = &'a CompiledAsset;
    type IntoIter = std::slice::Iter<'a, CompiledAsset>;

    fn into_iter(self) -> Self::IntoIter {
        self.assets.iter()
    }
}
