//! Build command implementations (build, resolve)

use std::path::{Component, Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::progress::{ConsoleProgress, JsonProgress};
use crate::build::{canonical_root, resolve_manifest, AssetStatus, BuildContext, BuildPipeline, BuildPlan, Manifest};
use crate::config::{load_config, merge_cli_overrides, CliOverrides, LoadedConfig};

/// Load glpack.toml (explicit, discovered or defaults) and apply `--root`.
fn load_project(root: Option<&Path>, config: Option<&Path>, verbose: bool) -> Option<LoadedConfig> {
    let mut loaded = match load_config(config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            return None;
        }
    };

    if verbose {
        match &loaded.source {
            Some(path) => println!("Using config: {}", path.display()),
            None => println!("No glpack.toml found, using defaults"),
        }
    }

    merge_cli_overrides(&mut loaded, &CliOverrides { asset_root: root.map(Path::to_path_buf) });
    Some(loaded)
}

/// Render a relative path with forward slashes on every platform.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn print_plan(plan: &BuildPlan, asset_root: &Path, target_dir: &Path) {
    println!("Dry run - would build:");
    println!("  Asset root: {}", asset_root.display());
    println!("  Output: {}", target_dir.display());
    println!("  Assets: {}", plan.len());
    let canonical = canonical_root(asset_root);
    for asset in plan {
        let source = asset.source.strip_prefix(&canonical).unwrap_or(&asset.source);
        println!("    {:<11} {} -> {}", asset.disposition.to_string(), slash_path(source), slash_path(&asset.destination));
    }
}

/// Run the build command
pub fn run_build(
    manifest: &Path,
    outdir: &Path,
    root: Option<&Path>,
    config: Option<&Path>,
    verbose: bool,
    json: bool,
    dry_run: bool,
) -> ExitCode {
    let Some(loaded) = load_project(root, config, verbose && !json) else {
        return ExitCode::from(EXIT_ERROR);
    };

    let context = BuildContext::from_config(&loaded, PathBuf::from(outdir))
        .with_verbose(verbose)
        .with_dry_run(dry_run);
    let pipeline = if json {
        BuildPipeline::new(context).with_reporter(JsonProgress::new())
    } else {
        BuildPipeline::new(context).with_reporter(ConsoleProgress::new().with_verbose(verbose))
    };

    let manifest = match Manifest::load(manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if dry_run {
        return match pipeline.plan(&manifest).and_then(|plan| pipeline.check_compilers(&plan).map(|()| plan)) {
            Ok(plan) => {
                print_plan(&plan, pipeline.context().asset_root(), pipeline.context().target_dir());
                ExitCode::from(EXIT_SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::from(EXIT_ERROR)
            }
        };
    }

    match pipeline.build(&manifest) {
        Ok(result) if result.is_success() => {
            if verbose {
                println!("{}", result.summary());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(result) => {
            for failure in result.failures() {
                if let AssetStatus::Failed(message) = &failure.status {
                    eprintln!("Error: {}", message);
                }
            }
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the resolve command
pub fn run_resolve(manifest: &Path, root: Option<&Path>, config: Option<&Path>) -> ExitCode {
    let Some(loaded) = load_project(root, config, false) else {
        return ExitCode::from(EXIT_ERROR);
    };
    let asset_root = loaded.asset_root();

    let files = match Manifest::load(manifest)
        .map_err(|e| e.to_string())
        .and_then(|m| resolve_manifest(&m, &asset_root).map_err(|e| e.to_string()))
    {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    for path in files.relative_paths(&asset_root) {
        println!("{}", slash_path(&path));
    }
    ExitCode::from(EXIT_SUCCESS)
}
