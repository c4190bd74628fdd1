//! Asset compilers.
//!
//! The pipeline only opens and wires the streams; turning a tile map or a
//! puzzle definition into engine data is the job of an [`AssetCompiler`].
//! The tile-map and puzzle compilers are external programs, wrapped by
//! [`ExternalCompiler`]. The puzzle index is compiled in-process.

use crate::build::puzzle_list::PuzzleListCompiler;
use crate::build::Disposition;
use crate::config::{CompilerCommand, CompilersConfig};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;

/// Placeholder in compiler arguments replaced with the asset root.
pub const ASSET_ROOT_PLACEHOLDER: &str = "{asset_root}";

/// Environment variable carrying the asset root to external compilers.
pub const ASSET_ROOT_ENV: &str = "GLPACK_ASSET_ROOT";

/// Error raised by a compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    /// No compiler is configured for this kind of asset
    #[error("No compiler configured for {0} assets")]
    Unavailable(Disposition),
    /// The compiler rejected its input
    #[error("{compiler} compiler failed: {message}")]
    Failed { compiler: String, message: String },
    /// The external program could not be started
    #[error("Failed to run {compiler} compiler '{program}': {source}")]
    Spawn {
        compiler: String,
        program: String,
        #[source]
        source: io::Error,
    },
    /// IO error on the source or output stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A converter from an authoring format to the engine's binary format.
pub trait AssetCompiler: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Read the source text and write the compiled representation.
    fn compile(
        &self,
        source: &mut dyn BufRead,
        asset_root: &Path,
        output: &mut dyn Write,
    ) -> Result<(), CompileError>;
}

/// Compiler running an external program.
///
/// The source is fed on stdin and stdout becomes the compiled output. Every
/// argument has `{asset_root}` replaced and the program also sees the root
/// in `GLPACK_ASSET_ROOT`.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    name: String,
    program: String,
    args: Vec<String>,
}

impl ExternalCompiler {
    /// Create a compiler from a program and its arguments.
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self { name: name.into(), program: program.into(), args }
    }

    /// Create a compiler from a configured command line.
    ///
    /// Returns `None` for an empty command.
    pub fn from_command(name: impl Into<String>, command: &CompilerCommand) -> Option<Self> {
        let (program, args) = command.command.split_first()?;
        Some(Self::new(name, program.clone(), args.to_vec()))
    }

    /// The program that gets executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with the asset root substituted.
    pub fn args_for(&self, asset_root: &Path) -> Vec<String> {
        let root = asset_root.to_string_lossy();
        self.args.iter().map(|a| a.replace(ASSET_ROOT_PLACEHOLDER, &root)).collect()
    }
}

impl AssetCompiler for ExternalCompiler {
    fn name(&self) -> &str {
        &self.name
    }

    fn compile(
        &self,
        source: &mut dyn BufRead,
        asset_root: &Path,
        output: &mut dyn Write,
    ) -> Result<(), CompileError> {
        let mut input = Vec::new();
        source.read_to_end(&mut input)?;

        let mut child = Command::new(&self.program)
            .args(self.args_for(asset_root))
            .env(ASSET_ROOT_ENV, asset_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CompileError::Spawn {
                compiler: self.name.clone(),
                program: self.program.clone(),
                source,
            })?;

        // stdin is fed from a helper thread so a child that writes before it
        // has consumed all of its input cannot block on a full pipe.
        let stdin = child.stdin.take();
        let result = thread::scope(|scope| {
            scope.spawn(move || {
                if let Some(mut stdin) = stdin {
                    // A child that exits early closes the pipe; its exit status reports the problem.
                    let _ = stdin.write_all(&input);
                }
            });
            child.wait_with_output()
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let message = match stderr.trim() {
                "" => format!("exited with {}", result.status),
                text => format!("exited with {}: {}", result.status, text),
            };
            return Err(CompileError::Failed { compiler: self.name.clone(), message });
        }

        output.write_all(&result.stdout)?;
        Ok(())
    }
}

/// The compilers available to a build, one slot per compiled disposition.
pub struct CompilerSet {
    map: Option<Box<dyn AssetCompiler>>,
    puzzle: Option<Box<dyn AssetCompiler>>,
    puzzle_list: Box<dyn AssetCompiler>,
}

impl std::fmt::Debug for CompilerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerSet")
            .field("map", &self.map.as_ref().map(|c| c.name().to_string()))
            .field("puzzle", &self.puzzle.as_ref().map(|c| c.name().to_string()))
            .field("puzzle_list", &self.puzzle_list.name())
            .finish()
    }
}

impl CompilerSet {
    /// Create a set with only the built-in puzzle list compiler.
    pub fn new() -> Self {
        Self { map: None, puzzle: None, puzzle_list: Box::new(PuzzleListCompiler) }
    }

    /// Create a set from the `[compilers]` config section.
    pub fn from_config(config: &CompilersConfig) -> Self {
        let mut set = Self::new();
        if let Some(compiler) = config.map.as_ref().and_then(|c| ExternalCompiler::from_command("map", c)) {
            set = set.with_map_compiler(compiler);
        }
        if let Some(compiler) =
            config.puzzle.as_ref().and_then(|c| ExternalCompiler::from_command("puzzle", c))
        {
            set = set.with_puzzle_compiler(compiler);
        }
        set
    }

    /// Set the tile-map compiler.
    pub fn with_map_compiler<C: AssetCompiler + 'static>(mut self, compiler: C) -> Self {
        self.map = Some(Box::new(compiler));
        self
    }

    /// Set the puzzle compiler.
    pub fn with_puzzle_compiler<C: AssetCompiler + 'static>(mut self, compiler: C) -> Self {
        self.puzzle = Some(Box::new(compiler));
        self
    }

    /// Replace the puzzle list compiler.
    pub fn with_puzzle_list_compiler<C: AssetCompiler + 'static>(mut self, compiler: C) -> Self {
        self.puzzle_list = Box::new(compiler);
        self
    }

    /// Look up the compiler for a disposition.
    ///
    /// Fails for verbatim copies and for compilers that are not configured.
    pub fn get(&self, disposition: Disposition) -> Result<&dyn AssetCompiler, CompileError> {
        let compiler = match disposition {
            Disposition::CompileMap => self.map.as_deref(),
            Disposition::CompilePuzzle => self.puzzle.as_deref(),
            Disposition::CompilePuzzleList => Some(self.puzzle_list.as_ref()),
            Disposition::CopyVerbatim => None,
        };
        compiler.ok_or(CompileError::Unavailable(disposition))
    }

    /// Check if a compiler is available for a disposition.
    pub fn has(&self, disposition: Disposition) -> bool {
        self.get(disposition).is_ok()
    }
}

impl Default for CompilerSet {
    fn default() -> Self {
        Self::new()
    }
}
