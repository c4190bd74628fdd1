//! Build context containing configuration and state for a build.

use crate::config::{absolute_path, DispatchConfig, GlpackConfig, LoadedConfig};
use std::path::{Path, PathBuf};

/// Everything a pipeline run needs to know about where things live.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Loaded configuration
    config: GlpackConfig,
    /// Absolute directory manifest patterns are resolved against
    asset_root: PathBuf,
    /// Absolute output directory, wiped at the start of a run
    target_dir: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
    /// Resolve and dispatch only, leave the output directory alone
    dry_run: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// # Arguments
    /// - `asset_root` - Directory manifest patterns are resolved against
    /// - `target_dir` - Directory the output tree is written to
    pub fn new(asset_root: PathBuf, target_dir: PathBuf) -> Self {
        Self { config: GlpackConfig::default(), asset_root, target_dir, verbose: false, dry_run: false }
    }

    /// Create a context from a loaded configuration.
    ///
    /// A relative target directory is taken relative to the working directory.
    pub fn from_config(loaded: &LoadedConfig, target_dir: PathBuf) -> Self {
        Self::new(loaded.asset_root(), absolute_path(target_dir)).with_config(loaded.config.clone())
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: GlpackConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &GlpackConfig {
        &self.config
    }

    /// Dispatch table settings.
    pub fn dispatch(&self) -> &DispatchConfig {
        &self.config.dispatch
    }

    /// Get the asset root.
    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Get the output directory.
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Whether this is a dry run.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve a path relative to the asset root.
    ///
    /// If the path is absolute, returns it unchanged.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }
}
