//! Format dispatch for resolved source files.
//!
//! Every resolved file is routed through an ordered table of rules. The first
//! rule whose predicate matches decides the [`Disposition`] and whether the
//! output file gets the compiled extension. Files matching no rule are copied
//! verbatim under their original name.

use crate::build::{canonical_root, BuildPlan, CompiledAsset, Disposition, ResolvedFileSet};
use crate::config::DispatchConfig;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Error while routing a file.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The resolved file does not lie inside the asset root
    #[error("'{}' is not inside the asset root '{}'", path.display(), asset_root.display())]
    OutsideAssetRoot { path: PathBuf, asset_root: PathBuf },
    /// Two sources would be written to the same output file
    #[error("'{}' and '{}' both produce '{}'", first.display(), second.display(), destination.display())]
    DuplicateDestination { destination: PathBuf, first: PathBuf, second: PathBuf },
}

/// Facts about a file that rules decide on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo<'a> {
    /// Path relative to the asset root
    pub relative: &'a Path,
    /// Lowercase extension without the dot
    pub extension: Option<String>,
    /// File name including the extension
    pub file_name: Option<&'a str>,
    /// Name of the directory directly containing the file
    pub parent_name: Option<&'a str>,
}

impl<'a> AssetInfo<'a> {
    /// Gather the facts for a relative path.
    pub fn new(relative: &'a Path) -> Self {
        Self {
            relative,
            extension: relative.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()),
            file_name: relative.file_name().and_then(|n| n.to_str()),
            parent_name: relative.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()),
        }
    }

    /// Check the lowercase extension against a list of candidates.
    pub fn has_extension(&self, candidates: &[String]) -> bool {
        match &self.extension {
            Some(ext) => candidates.iter().any(|c| c.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }

    /// Check if the file sits directly in a directory with the given name.
    pub fn is_in_dir(&self, dir_name: &str) -> bool {
        self.parent_name == Some(dir_name)
    }
}

type Predicate = Box<dyn Fn(&AssetInfo<'_>) -> bool + Send + Sync>;

/// One entry of the dispatch table.
pub struct DispatchRule {
    name: String,
    predicate: Predicate,
    disposition: Disposition,
    output_extension: Option<String>,
}

impl std::fmt::Debug for DispatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRule")
            .field("name", &self.name)
            .field("disposition", &self.disposition)
            .field("output_extension", &self.output_extension)
            .finish()
    }
}

impl DispatchRule {
    /// Create a rule from an arbitrary predicate.
    pub fn new<F>(name: impl Into<String>, disposition: Disposition, predicate: F) -> Self
    where
        F: Fn(&AssetInfo<'_>) -> bool + Send + Sync + 'static,
    {
        Self { name: name.into(), predicate: Box::new(predicate), disposition, output_extension: None }
    }

    /// Replace the extension of the output file.
    pub fn with_output_extension(mut self, extension: impl Into<String>) -> Self {
        self.output_extension = Some(extension.into());
        self
    }

    /// Rule name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Disposition assigned by this rule.
    pub fn disposition(&self) -> Disposition {
        self.disposition
    }

    /// Check if the rule applies to a file.
    pub fn matches(&self, info: &AssetInfo<'_>) -> bool {
        (self.predicate)(info)
    }

    fn destination(&self, relative: &Path) -> PathBuf {
        match &self.output_extension {
            Some(ext) => relative.with_extension(ext),
            None => relative.to_path_buf(),
        }
    }
}

/// Ordered rule table routing files to their handler.
#[derive(Debug, Default)]
pub struct Dispatcher {
    rules: Vec<DispatchRule>,
}

impl Dispatcher {
    /// Create a dispatcher without rules (everything is copied).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard table for the game's asset types.
    ///
    /// Priority order: tile maps, puzzles, the puzzle index, then the
    /// implicit verbatim copy.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let compiled = config.compiled_extension.clone();

        let map_extensions = config.map_extensions.clone();
        let maps = DispatchRule::new("tile-map", Disposition::CompileMap, move |info| {
            info.has_extension(&map_extensions)
        })
        .with_output_extension(compiled.clone());

        let puzzle_dir = config.puzzle_dir.clone();
        let puzzle_extension = vec![config.puzzle_extension.clone()];
        let puzzles = DispatchRule::new("puzzle", Disposition::CompilePuzzle, move |info| {
            info.is_in_dir(&puzzle_dir) && info.has_extension(&puzzle_extension)
        })
        .with_output_extension(compiled.clone());

        let puzzle_dir = config.puzzle_dir.clone();
        let list_name = config.puzzle_list_name.clone();
        let puzzle_list = DispatchRule::new("puzzle-list", Disposition::CompilePuzzleList, move |info| {
            info.is_in_dir(&puzzle_dir) && info.file_name == Some(list_name.as_str())
        })
        .with_output_extension(compiled);

        Self::new().with_rule(maps).with_rule(puzzles).with_rule(puzzle_list)
    }

    /// Append a rule with lower priority than all existing ones.
    pub fn with_rule(mut self, rule: DispatchRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// The rules in priority order.
    pub fn rules(&self) -> &[DispatchRule] {
        &self.rules
    }

    /// Decide disposition and destination for a path relative to the asset root.
    pub fn classify(&self, relative: &Path) -> (Disposition, PathBuf) {
        let info = AssetInfo::new(relative);
        match self.rules.iter().find(|rule| rule.matches(&info)) {
            Some(rule) => (rule.disposition, rule.destination(relative)),
            None => (Disposition::CopyVerbatim, relative.to_path_buf()),
        }
    }

    /// Route a single resolved source file.
    pub fn dispatch(&self, source: &Path, asset_root: &Path) -> Result<CompiledAsset, DispatchError> {
        let relative = relative_to_root(source, asset_root)?;
        let (disposition, destination) = self.classify(&relative);
        Ok(CompiledAsset::new(source.to_path_buf(), destination, disposition))
    }

    /// Route the whole resolved set, in its deterministic order.
    ///
    /// Resolved files are canonical, so they are taken relative to the
    /// canonical asset root.
    pub fn plan(&self, files: &ResolvedFileSet, asset_root: &Path) -> Result<BuildPlan, DispatchError> {
        let asset_root = canonical_root(asset_root);
        let mut plan = BuildPlan::new();
        let mut seen: HashMap<PathBuf, PathBuf> = HashMap::new();

        for source in files {
            let asset = self.dispatch(source, &asset_root)?;
            if let Some(first) = seen.get(&asset.destination) {
                return Err(DispatchError::DuplicateDestination {
                    destination: asset.destination.clone(),
                    first: first.clone(),
                    second: asset.source.clone(),
                });
            }
            seen.insert(asset.destination.clone(), asset.source.clone());
            plan.add_asset(asset);
        }

        Ok(plan)
    }
}

/// Compute the path of a source file relative to the asset root.
///
/// Only plain components are accepted, so the result can never point outside
/// the target directory when joined onto it.
pub fn relative_to_root(source: &Path, asset_root: &Path) -> Result<PathBuf, DispatchError> {
    let outside = || DispatchError::OutsideAssetRoot {
        path: source.to_path_buf(),
        asset_root: asset_root.to_path_buf(),
    };

    let relative = source.strip_prefix(asset_root).map_err(|_| outside())?;
    let plain = relative.components().all(|c| matches!(c, Component::Normal(_)));
    if !plain || relative.as_os_str().is_empty() {
        return Err(outside());
    }
    Ok(relative.to_path_buf())
}
