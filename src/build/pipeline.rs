//! Build pipeline orchestration.
//!
//! A run goes manifest, resolved file set, build plan, fresh output tree and
//! then one asset at a time through its compiler or the verbatim copy.
//! Everything that can be checked up front (manifest, patterns, routing,
//! compiler availability) is checked before the output directory is touched.

use crate::build::compiler::{CompileError, CompilerSet};
use crate::build::dispatch::{DispatchError, Dispatcher};
use crate::build::output_tree::{self, OutputError};
use crate::build::progress::{NullProgress, ProgressEvent, ProgressReporter, ProgressTracker};
use crate::build::{
    resolve_manifest, AssetResult, BuildContext, BuildPlan, BuildResult, CompiledAsset, DiscoveryError,
    Disposition, Manifest, ManifestError, ResolvedFileSet,
};
use crate::config::ConfigError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

/// Error that aborts a run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Manifest could not be read or parsed
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Pattern resolution failed
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// A file could not be routed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// A required compiler is missing
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Output tree could not be prepared
    #[error(transparent)]
    Output(#[from] OutputError),
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Error while processing a single asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The compiler failed
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// Reading the source or writing the output failed
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Build pipeline for executing runs.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
    /// Routing table
    dispatcher: Dispatcher,
    /// Compilers by disposition
    compilers: CompilerSet,
    /// Diagnostics sink
    reporter: Box<dyn ProgressReporter>,
    /// Whether to stop on first failed asset
    fail_fast: bool,
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline")
            .field("context", &self.context)
            .field("dispatcher", &self.dispatcher)
            .field("compilers", &self.compilers)
            .field("fail_fast", &self.fail_fast)
            .finish()
    }
}

impl BuildPipeline {
    /// Create a new build pipeline.
    ///
    /// Dispatch rules and external compilers come from the context's config.
    pub fn new(context: BuildContext) -> Self {
        let dispatcher = Dispatcher::from_config(context.dispatch());
        let compilers = CompilerSet::from_config(&context.config().compilers);
        Self { context, dispatcher, compilers, reporter: Box::new(NullProgress), fail_fast: true }
    }

    /// Replace the compiler set.
    pub fn with_compilers(mut self, compilers: CompilerSet) -> Self {
        self.compilers = compilers;
        self
    }

    /// Replace the dispatch table.
    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Set the progress reporter.
    pub fn with_reporter<R: ProgressReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    /// Set fail-fast mode (stop on first failed asset). On by default.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Load a manifest file and run it.
    pub fn build_file(&self, manifest_path: &Path) -> Result<BuildResult, BuildError> {
        let manifest = Manifest::load(manifest_path)?;
        self.build(&manifest)
    }

    /// Run the pipeline for a manifest.
    ///
    /// The returned result may still contain a failed asset; the run then
    /// stopped there (or, without fail-fast, went on with the next one).
    pub fn build(&self, manifest: &Manifest) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let plan = self.plan(manifest)?;
        let mut result = self.build_plan(&plan)?;
        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Resolve the manifest against the asset root.
    pub fn resolve(&self, manifest: &Manifest) -> Result<ResolvedFileSet, BuildError> {
        Ok(resolve_manifest(manifest, self.context.asset_root())?)
    }

    /// Resolve and route a manifest without touching the filesystem.
    pub fn plan(&self, manifest: &Manifest) -> Result<BuildPlan, BuildError> {
        let files = self.resolve(manifest)?;
        Ok(self.dispatcher.plan(&files, self.context.asset_root())?)
    }

    /// Check that every compiler the plan needs is configured.
    pub fn check_compilers(&self, plan: &BuildPlan) -> Result<(), BuildError> {
        for disposition in [Disposition::CompileMap, Disposition::CompilePuzzle, Disposition::CompilePuzzleList] {
            if plan.count(disposition) > 0 {
                self.compilers.get(disposition)?;
            }
        }
        Ok(())
    }

    /// Execute an existing plan.
    pub fn build_plan(&self, plan: &BuildPlan) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        self.check_compilers(plan)?;

        if !self.context.is_dry_run() {
            output_tree::prepare_output_dir(self.context.target_dir(), self.context.asset_root())?;
        }

        let mut tracker = ProgressTracker::new();
        tracker.start(plan.len());
        self.reporter.report(ProgressEvent::BuildStarted { total_assets: plan.len() });
        if plan.is_empty() {
            self.reporter.report(ProgressEvent::Warning {
                asset_id: None,
                message: "Manifest matched no files".to_string(),
            });
        }

        let mut result = BuildResult::new();
        for (index, asset) in plan.assets().iter().enumerate() {
            let asset_result = self.execute_asset(asset);
            tracker.asset_completed(&asset_result.status);
            let failed = asset_result.status.is_failure();
            result.add_result(asset_result);

            let remaining = plan.len() - index - 1;
            if failed && self.fail_fast {
                if remaining > 0 {
                    self.reporter.report(ProgressEvent::Error {
                        asset_id: Some(asset.id()),
                        message: format!("Stopping, {} assets not processed", remaining),
                    });
                }
                break;
            }
        }

        self.reporter.report(tracker.build_completed_event());
        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Process a single asset and report it.
    fn execute_asset(&self, asset: &CompiledAsset) -> AssetResult {
        let start = Instant::now();
        let output = asset.output_path(self.context.target_dir());

        self.reporter.report(ProgressEvent::AssetStarted {
            source: asset.source.display().to_string(),
            asset_id: asset.id(),
            disposition: asset.disposition,
        });

        let result = if self.context.is_dry_run() {
            AssetResult::planned(asset.id(), asset.source.clone(), output, asset.disposition)
        } else {
            match self.process(asset, &output) {
                Ok(bytes) => AssetResult::success(
                    asset.id(),
                    asset.source.clone(),
                    output,
                    asset.disposition,
                    bytes,
                    start.elapsed(),
                ),
                Err(e) => AssetResult::failed(
                    asset.id(),
                    asset.source.clone(),
                    output,
                    asset.disposition,
                    e.to_string(),
                    start.elapsed(),
                ),
            }
        };

        self.reporter.report(ProgressEvent::AssetCompleted {
            asset_id: result.asset_id.clone(),
            status: result.status.clone(),
            duration_ms: result.duration.as_millis() as u64,
        });
        result
    }

    /// Produce the output file for an asset.
    ///
    /// Returns the number of bytes written.
    pub fn process(&self, asset: &CompiledAsset, output: &Path) -> Result<u64, AssetError> {
        if asset.disposition == Disposition::CopyVerbatim {
            return Ok(output_tree::copy_verbatim(&asset.source, output)?);
        }

        let compiler = self.compilers.get(asset.disposition)?;
        let source = File::open(&asset.source).map_err(OutputError::io("open", &asset.source))?;
        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(output_tree::create_output_file(output)?);

        compiler.compile(&mut reader, self.context.asset_root(), &mut writer)?;
        writer.flush().map_err(OutputError::io("write", output))?;
        drop(writer);

        let written = fs::metadata(output).map_err(OutputError::io("read metadata of", output))?.len();
        Ok(written)
    }
}

/// Builder for configuring and running builds.
pub struct Build {
    context: Option<BuildContext>,
    compilers: Option<CompilerSet>,
    reporter: Option<Box<dyn ProgressReporter>>,
    fail_fast: bool,
    dry_run: bool,
    verbose: bool,
}

impl Build {
    /// Create a new build builder.
    pub fn new() -> Self {
        Self { context: None, compilers: None, reporter: None, fail_fast: true, dry_run: false, verbose: false }
    }

    /// Set the build context.
    pub fn context(mut self, context: BuildContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Use these compilers instead of the configured ones.
    pub fn compilers(mut self, compilers: CompilerSet) -> Self {
        self.compilers = Some(compilers);
        self
    }

    /// Set the progress reporter.
    pub fn reporter<R: ProgressReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    /// Set fail-fast mode.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Set dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set verbose mode.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Create the configured pipeline.
    pub fn pipeline(self) -> Option<BuildPipeline> {
        let context = self.context?.with_verbose(self.verbose).with_dry_run(self.dry_run);
        let mut pipeline = BuildPipeline::new(context).with_fail_fast(self.fail_fast);
        if let Some(compilers) = self.compilers {
            pipeline = pipeline.with_compilers(compilers);
        }
        if let Some(reporter) = self.reporter {
            pipeline.reporter = reporter;
        }
        Some(pipeline)
    }

    /// Run the build for a manifest file.
    pub fn run(self, manifest_path: &Path) -> Result<BuildResult, BuildError> {
        let pipeline = self.pipeline().ok_or_else(|| {
            BuildError::Config(ConfigError::Validation(vec!["no build context provided".to_string()]))
        })?;
        pipeline.build_file(manifest_path)
    }
}

impl Default for Build {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::compiler::AssetCompiler;
    use crate::build::AssetStatus;
    use std::io::{BufRead, Read};
    use tempfile::TempDir;

    /// Writes a tag followed by the source bytes.
    struct TagCompiler(&'static str);

    impl AssetCompiler for TagCompiler {
        fn name(&self) -> &str {
            self.0
        }

        fn compile(
            &self,
            source: &mut dyn BufRead,
            _asset_root: &Path,
            output: &mut dyn Write,
        ) -> Result<(), CompileError> {
            let mut bytes = Vec::new();
            source.read_to_end(&mut bytes)?;
            output.write_all(self.0.as_bytes())?;
            output.write_all(&bytes)?;
            Ok(())
        }
    }

    struct FailingCompiler;

    impl AssetCompiler for FailingCompiler {
        fn name(&self) -> &str {
            "puzzle"
        }

        fn compile(
            &self,
            _source: &mut dyn BufRead,
            _asset_root: &Path,
            _output: &mut dyn Write,
        ) -> Result<(), CompileError> {
            Err(CompileError::Failed { compiler: "puzzle".to_string(), message: "broken".to_string() })
        }
    }

    fn create_test_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn create_test_context() -> (TempDir, BuildContext) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("art");
        fs::create_dir_all(&root).unwrap();
        let ctx = BuildContext::new(root, temp.path().join("out"));
        (temp, ctx)
    }

    fn stub_compilers() -> CompilerSet {
        CompilerSet::new().with_map_compiler(TagCompiler("MAP:")).with_puzzle_compiler(TagCompiler("PZL:"))
    }

    #[test]
    fn test_build_pipeline_defaults() {
        let (_temp, ctx) = create_test_context();
        let pipeline = BuildPipeline::new(ctx);
        assert!(pipeline.fail_fast);
        assert_eq!(pipeline.dispatcher.rules().len(), 3);
    }

    #[test]
    fn test_build_empty_manifest_creates_target() {
        let (temp, ctx) = create_test_context();
        let pipeline = BuildPipeline::new(ctx);

        let result = pipeline.build(&Manifest::new()).unwrap();
        assert!(result.is_success());
        assert!(result.assets.is_empty());
        assert!(temp.path().join("out").is_dir());
    }

    #[test]
    fn test_build_routes_every_kind() {
        let (temp, ctx) = create_test_context();
        let root = ctx.asset_root().to_path_buf();
        create_test_file(&root, "maps/main.tmx", "<map/>");
        create_test_file(&root, "puzzles/p1.xml", "<puzzle/>");
        create_test_file(&root, "puzzles/puzzle_list.txt", "p1\n");
        create_test_file(&root, "sprites/droid.png", "png");

        let pipeline = BuildPipeline::new(ctx).with_compilers(stub_compilers());
        let manifest = Manifest::parse_str("**/*\n").unwrap();
        let result = pipeline.build(&manifest).unwrap();

        let out = temp.path().join("out");
        assert!(result.is_success(), "{}", result.summary());
        assert_eq!(result.compiled_count(), 3);
        assert_eq!(result.copied_count(), 1);
        assert_eq!(fs::read_to_string(out.join("maps/main.bin")).unwrap(), "MAP:<map/>");
        assert_eq!(fs::read_to_string(out.join("puzzles/p1.bin")).unwrap(), "PZL:<puzzle/>");
        assert_eq!(&fs::read(out.join("puzzles/puzzle_list.bin")).unwrap()[..4], b"TSLP");
        assert_eq!(fs::read_to_string(out.join("sprites/droid.png")).unwrap(), "png");
    }

    #[test]
    fn test_missing_compiler_fails_before_wipe() {
        let (temp, ctx) = create_test_context();
        create_test_file(ctx.asset_root(), "maps/main.tmx", "<map/>");
        create_test_file(&temp.path().join("out"), "keep.txt", "old");

        let pipeline = BuildPipeline::new(ctx);
        let err = pipeline.build(&Manifest::parse_str("maps/*.tmx\n").unwrap()).unwrap_err();

        assert!(matches!(err, BuildError::Compile(CompileError::Unavailable(Disposition::CompileMap))));
        assert!(temp.path().join("out/keep.txt").exists());
    }

    #[test]
    fn test_compiler_failure_stops_run() {
        let (temp, ctx) = create_test_context();
        let root = ctx.asset_root().to_path_buf();
        create_test_file(&root, "puzzles/a.xml", "<puzzle/>");
        create_test_file(&root, "puzzles/b.xml", "<puzzle/>");

        let pipeline = BuildPipeline::new(ctx).with_compilers(CompilerSet::new().with_puzzle_compiler(FailingCompiler));
        let result = pipeline.build(&Manifest::parse_str("puzzles/*\n").unwrap()).unwrap();

        assert!(!result.is_success());
        assert_eq!(result.assets.len(), 1);
        assert!(matches!(result.assets[0].status, AssetStatus::Failed(ref e) if e.contains("broken")));
        assert!(!temp.path().join("out/puzzles/b.bin").exists());
    }

    /// Records the kind of every reported event.
    #[derive(Clone, Default)]
    struct RecordingReporter(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: ProgressEvent) {
            let kind = match event {
                ProgressEvent::BuildStarted { .. } => "build_started".to_string(),
                ProgressEvent::AssetStarted { asset_id, .. } => format!("started {}", asset_id),
                ProgressEvent::AssetCompleted { asset_id, .. } => format!("completed {}", asset_id),
                ProgressEvent::BuildCompleted { success, .. } => format!("build_completed {}", success),
                ProgressEvent::Warning { message, .. } => format!("warning {}", message),
                ProgressEvent::Error { message, .. } => format!("error {}", message),
            };
            self.0.lock().unwrap().push(kind);
        }
    }

    #[test]
    fn test_fail_fast_reports_skipped_assets() {
        let (_temp, ctx) = create_test_context();
        let root = ctx.asset_root().to_path_buf();
        create_test_file(&root, "puzzles/a.xml", "<puzzle/>");
        create_test_file(&root, "puzzles/b.xml", "<puzzle/>");
        create_test_file(&root, "puzzles/c.xml", "<puzzle/>");
        let recorder = RecordingReporter::default();

        let pipeline = BuildPipeline::new(ctx)
            .with_compilers(CompilerSet::new().with_puzzle_compiler(FailingCompiler))
            .with_reporter(recorder.clone());
        pipeline.build(&Manifest::parse_str("puzzles/*.xml\n").unwrap()).unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "build_started",
                "started puzzles/a.bin",
                "completed puzzles/a.bin",
                "error Stopping, 2 assets not processed",
                "build_completed false",
            ]
        );
    }

    #[test]
    fn test_empty_plan_warns() {
        let (_temp, ctx) = create_test_context();
        let recorder = RecordingReporter::default();

        let pipeline = BuildPipeline::new(ctx).with_reporter(recorder.clone());
        pipeline.build(&Manifest::parse_str("maps/*.tmx\n").unwrap()).unwrap();

        let events = recorder.0.lock().unwrap().clone();
        assert!(events.contains(&"warning Manifest matched no files".to_string()));
    }

    #[test]
    fn test_compiler_failure_without_fail_fast() {
        let (_temp, ctx) = create_test_context();
        let root = ctx.asset_root().to_path_buf();
        create_test_file(&root, "puzzles/a.xml", "<puzzle/>");
        create_test_file(&root, "puzzles/b.xml", "<puzzle/>");

        let pipeline = BuildPipeline::new(ctx)
            .with_compilers(CompilerSet::new().with_puzzle_compiler(FailingCompiler))
            .with_fail_fast(false);
        let result = pipeline.build(&Manifest::parse_str("puzzles/*\n").unwrap()).unwrap();

        assert_eq!(result.failed_count(), 2);
    }

    #[test]
    fn test_dry_run_leaves_target_alone() {
        let (temp, ctx) = create_test_context();
        create_test_file(ctx.asset_root(), "sprites/droid.png", "png");
        create_test_file(&temp.path().join("out"), "keep.txt", "old");

        let result = Build::new()
            .context(ctx)
            .dry_run(true)
            .pipeline()
            .unwrap()
            .build(&Manifest::parse_str("**/*.png\n").unwrap())
            .unwrap();

        assert_eq!(result.planned_count(), 1);
        assert!(temp.path().join("out/keep.txt").exists());
        assert!(!temp.path().join("out/sprites").exists());
    }

    #[test]
    fn test_check_compilers() {
        let (_temp, ctx) = create_test_context();
        create_test_file(ctx.asset_root(), "maps/main.tmx", "<map/>");
        create_test_file(ctx.asset_root(), "puzzles/puzzle_list.txt", "a\n");
        let manifest = Manifest::parse_str("**/*\n").unwrap();

        let pipeline = BuildPipeline::new(ctx.clone());
        let plan = pipeline.plan(&manifest).unwrap();
        let err = pipeline.check_compilers(&plan).unwrap_err();
        assert!(matches!(err, BuildError::Compile(CompileError::Unavailable(Disposition::CompileMap))));

        let configured = BuildPipeline::new(ctx).with_compilers(stub_compilers());
        assert!(configured.check_compilers(&plan).is_ok());
    }

    #[test]
    fn test_invalid_pattern_fails_before_wipe() {
        let (temp, ctx) = create_test_context();
        create_test_file(&temp.path().join("out"), "keep.txt", "old");

        let err = BuildPipeline::new(ctx).build(&Manifest::parse_str("maps/***.tmx\n").unwrap()).unwrap_err();
        assert!(matches!(err, BuildError::Discovery(_)));
        assert!(temp.path().join("out/keep.txt").exists());
    }

    #[test]
    fn test_build_builder_without_context() {
        let err = Build::new().run(Path::new("assets.txt")).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}
