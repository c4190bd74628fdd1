//! Configuration loading and discovery for `glpack.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::GlpackConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "glpack.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parsing error
    #[error("Failed to parse glpack.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the asset root
    pub asset_root: Option<PathBuf>,
}

/// A loaded configuration together with the directory it applies to.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed configuration
    pub config: GlpackConfig,
    /// Directory holding glpack.toml, or the working directory without one
    pub project_root: PathBuf,
    /// The file the configuration came from
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    /// Absolute asset root.
    pub fn asset_root(&self) -> PathBuf {
        resolve_path(&self.project_root, &self.config.project.asset_root)
    }
}

/// Find glpack.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find glpack.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a glpack.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration rooted at the current directory.
///
/// # Example
/// ```ignore
/// let loaded = load_config(None)?;
/// println!("assets under {}", loaded.asset_root().display());
/// ```
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            let config = load_config_file(&p)?;
            let project_root = project_root(&p)
                .filter(|root| !root.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(current_dir);
            Ok(LoadedConfig { config, project_root: absolute_path(project_root), source: Some(p) })
        }
        None => Ok(LoadedConfig { config: default_config(), project_root: current_dir(), source: None }),
    }
}

/// Load configuration from a specific file path.
pub fn load_config_file(path: &Path) -> Result<GlpackConfig, ConfigError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config: GlpackConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Create the configuration used when no glpack.toml is found.
pub fn default_config() -> GlpackConfig {
    GlpackConfig::default()
}

/// Merge CLI overrides into a loaded configuration.
///
/// CLI arguments take precedence over config file values. A root given on
/// the command line is relative to the working directory, not the project.
pub fn merge_cli_overrides(loaded: &mut LoadedConfig, overrides: &CliOverrides) {
    if let Some(ref root) = overrides.asset_root {
        loaded.config.project.asset_root = absolute_path(root.clone());
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

fn current_dir() -> PathBuf {
    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Make a path absolute against the working directory.
pub fn absolute_path(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        current_dir().join(path)
    }
}
