//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod inspect;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// glpack - Build the game's asset tree from a manifest
#[derive(Parser)]
#[command(name = "glpack")]
#[command(about = "glpack - Resolve an asset manifest and compile it into a runtime asset tree")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Wipe the output directory and build every asset in the manifest
    Build {
        /// Manifest file, one glob pattern per line (`-` prefix excludes)
        manifest: PathBuf,

        /// Target directory (deleted and recreated)
        #[arg(short = 'o', long = "outdir")]
        outdir: PathBuf,

        /// Asset root, overrides glpack.toml
        #[arg(long)]
        root: Option<PathBuf>,

        /// Config file (default: glpack.toml found from the current directory up)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print a line for every finished asset
        #[arg(short, long)]
        verbose: bool,

        /// Report progress as JSON lines on stderr
        #[arg(long, conflicts_with = "verbose")]
        json: bool,

        /// Resolve and dispatch only, print the plan and leave the output alone
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the files a manifest resolves to, relative to the asset root
    Resolve {
        /// Manifest file
        manifest: PathBuf,

        /// Asset root, overrides glpack.toml
        #[arg(long)]
        root: Option<PathBuf>,

        /// Config file (default: glpack.toml found from the current directory up)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the entries of a compiled puzzle list
    Inspect {
        /// Compiled puzzle list (.bin)
        file: PathBuf,
    },
}

/// Parse the command line and run the selected command.
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_INVALID_ARGS)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };

    match cli.command {
        Commands::Build { manifest, outdir, root, config, verbose, json, dry_run } => build::run_build(
            &manifest,
            &outdir,
            root.as_deref(),
            config.as_deref(),
            verbose,
            json,
            dry_run,
        ),
        Commands::Resolve { manifest, root, config } => {
            build::run_resolve(&manifest, root.as_deref(), config.as_deref())
        }
        Commands::Inspect { file } => inspect::run_inspect(&file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["glpack", "build", "assets.txt", "-o", "out", "--dry-run"]).unwrap();
        match cli.command {
            Commands::Build { manifest, outdir, dry_run, verbose, .. } => {
                assert_eq!(manifest, PathBuf::from("assets.txt"));
                assert_eq!(outdir, PathBuf::from("out"));
                assert!(dry_run);
                assert!(!verbose);
            }
            _ => panic!("Expected build command"),
        }
    }

    #[test]
    fn test_build_requires_outdir() {
        let err = Cli::try_parse_from(["glpack", "build", "assets.txt"]).err().unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_json_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["glpack", "build", "a.txt", "-o", "out", "--json", "--verbose"]).is_err());
    }
}
