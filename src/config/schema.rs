//! Configuration schema types for `glpack.toml`
//!
//! Defines the structure and validation rules for an asset project.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory all manifest patterns are resolved against
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("art")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { asset_root: default_asset_root() }
    }
}

/// Routing of resolved files to compilers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Tile-map file extensions, compared case-insensitively
    #[serde(default = "default_map_extensions")]
    pub map_extensions: Vec<String>,
    /// Name of the directory holding puzzle assets
    #[serde(default = "default_puzzle_dir")]
    pub puzzle_dir: String,
    /// Extension of structured puzzle files
    #[serde(default = "default_puzzle_extension")]
    pub puzzle_extension: String,
    /// File name of the puzzle index
    #[serde(default = "default_puzzle_list_name")]
    pub puzzle_list_name: String,
    /// Extension given to every compiled output
    #[serde(default = "default_compiled_extension")]
    pub compiled_extension: String,
}

fn default_map_extensions() -> Vec<String> {
    vec!["tmx".to_string()]
}

fn default_puzzle_dir() -> String {
    "puzzles".to_string()
}

fn default_puzzle_extension() -> String {
    "xml".to_string()
}

fn default_puzzle_list_name() -> String {
    "puzzle_list.txt".to_string()
}

fn default_compiled_extension() -> String {
    "bin".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            map_extensions: default_map_extensions(),
            puzzle_dir: default_puzzle_dir(),
            puzzle_extension: default_puzzle_extension(),
            puzzle_list_name: default_puzzle_list_name(),
            compiled_extension: default_compiled_extension(),
        }
    }
}

/// An external compiler command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerCommand {
    /// Program followed by its arguments; `{asset_root}` is substituted
    pub command: Vec<String>,
}

/// External compilers, unconfigured by default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilersConfig {
    /// Tile-map compiler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<CompilerCommand>,
    /// Puzzle compiler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle: Option<CompilerCommand>,
}

/// Complete glpack.toml configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlpackConfig {
    /// Project paths
    #[serde(default)]
    pub project: ProjectConfig,
    /// Dispatch table settings
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// External compilers
    #[serde(default)]
    pub compilers: CompilersConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "dispatch.puzzle_dir")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "glpack.toml: '{}' {}", self.field, self.message)
    }
}

fn check_extension(errors: &mut Vec<ConfigValidationError>, field: String, value: &str) {
    if value.is_empty() {
        errors.push(ConfigValidationError { field, message: "must be a non-empty string".to_string() });
    } else if value.starts_with('.') {
        errors.push(ConfigValidationError { field, message: "must not start with a dot".to_string() });
    }
}

fn check_name(errors: &mut Vec<ConfigValidationError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(ConfigValidationError {
            field: field.to_string(),
            message: "must be a non-empty string".to_string(),
        });
    } else if value.contains(['/', '\\']) {
        errors.push(ConfigValidationError {
            field: field.to_string(),
            message: "must be a single path component".to_string(),
        });
    }
}

impl GlpackConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.project.asset_root.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "project.asset_root".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        let dispatch = &self.dispatch;
        if dispatch.map_extensions.is_empty() {
            errors.push(ConfigValidationError {
                field: "dispatch.map_extensions".to_string(),
                message: "must contain at least one extension".to_string(),
            });
        }
        for (i, ext) in dispatch.map_extensions.iter().enumerate() {
            check_extension(&mut errors, format!("dispatch.map_extensions[{}]", i), ext);
        }
        check_extension(&mut errors, "dispatch.puzzle_extension".to_string(), &dispatch.puzzle_extension);
        check_extension(&mut errors, "dispatch.compiled_extension".to_string(), &dispatch.compiled_extension);
        check_name(&mut errors, "dispatch.puzzle_dir", &dispatch.puzzle_dir);
        check_name(&mut errors, "dispatch.puzzle_list_name", &dispatch.puzzle_list_name);

        for (name, compiler) in [("map", &self.compilers.map), ("puzzle", &self.compilers.puzzle)] {
            if let Some(compiler) = compiler {
                if compiler.command.first().map_or(true, |program| program.is_empty()) {
                    errors.push(ConfigValidationError {
                        field: format!("compilers.{}.command", name),
                        message: "must name a program to run".to_string(),
                    });
                }
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
