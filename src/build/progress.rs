//! Build progress reporting.
//!
//! Diagnostics for a pipeline run go through a [`ProgressReporter`]. They are
//! informational only and never change what ends up in the output tree.
//!
//! # Example
//!
//! ```ignore
//! use glpack::build::progress::{ConsoleProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = ConsoleProgress::new();
//! reporter.report(ProgressEvent::BuildStarted { total_assets: 2 });
//! ```

use crate::build::{AssetStatus, Disposition};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Events that can be reported during a build.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started, the plan is known
    BuildStarted {
        /// Number of assets in the plan
        total_assets: usize,
    },
    /// An asset is about to be processed
    AssetStarted {
        /// Absolute source path
        source: String,
        /// Destination relative to the target directory
        asset_id: String,
        /// Handler for the asset
        disposition: Disposition,
    },
    /// An asset was processed
    AssetCompleted {
        /// Destination relative to the target directory
        asset_id: String,
        /// Outcome
        status: AssetStatus,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// Run finished
    BuildCompleted {
        /// Whether the run succeeded
        success: bool,
        /// Total duration in milliseconds
        duration_ms: u64,
        /// Number of compiled assets
        compiled: usize,
        /// Number of copied assets
        copied: usize,
        /// Number of failed assets
        failed: usize,
    },
    /// A warning was generated
    Warning {
        /// Asset that generated the warning (if applicable)
        asset_id: Option<String>,
        /// Warning message
        message: String,
    },
    /// An error occurred
    Error {
        /// Asset that generated the error (if applicable)
        asset_id: Option<String>,
        /// Error message
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    verbose: bool,
    current: AtomicUsize,
    total: AtomicUsize,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .field("current", &self.current)
            .field("total", &self.total)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a console reporter on stderr, colored if stderr is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn bold(&self, text: &str) -> String {
        self.color(text, "\x1b[1m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { total_assets } => {
                self.total.store(total_assets, Ordering::SeqCst);
                self.current.store(0, Ordering::SeqCst);
                if self.verbose {
                    self.writeln(&format!(
                        "{} {} asset{} to process",
                        self.cyan("[assets]"),
                        total_assets,
                        if total_assets == 1 { "" } else { "s" }
                    ));
                }
            }
            ProgressEvent::AssetStarted { source, .. } => {
                self.writeln(&format!("Processing asset '{}'", source));
            }
            ProgressEvent::AssetCompleted { asset_id, status, duration_ms } => {
                let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                let total = self.total.load(Ordering::SeqCst);

                if let AssetStatus::Failed(err) = &status {
                    self.writeln(&format!(
                        "{} [{}/{}] {} {}",
                        self.cyan("[assets]"),
                        current,
                        total,
                        self.red("FAILED"),
                        asset_id
                    ));
                    self.writeln(&format!("        {}", self.red(err)));
                } else if self.verbose {
                    let status_str = match &status {
                        AssetStatus::Planned => self.yellow("planned"),
                        other => self.green(&other.to_string()),
                    };
                    self.writeln(&format!(
                        "{} [{}/{}] {} {} ({})",
                        self.cyan("[assets]"),
                        current,
                        total,
                        status_str,
                        asset_id,
                        format_duration(duration_ms)
                    ));
                }
            }
            ProgressEvent::BuildCompleted { success, duration_ms, compiled, copied, failed } => {
                let duration_str = format_duration(duration_ms);
                if success {
                    self.writeln(&format!(
                        "{} {} compiled, {} copied in {}",
                        self.green("[done]"),
                        self.bold(&compiled.to_string()),
                        copied,
                        duration_str
                    ));
                } else {
                    self.writeln(&format!(
                        "{} Build failed: {} compiled, {} copied, {} {} in {}",
                        self.red("[error]"),
                        compiled,
                        copied,
                        failed,
                        if failed == 1 { "failure" } else { "failures" },
                        duration_str
                    ));
                }
            }
            ProgressEvent::Warning { asset_id, message } => {
                let prefix = asset_id.map(|id| format!("{}: ", id)).unwrap_or_default();
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
            ProgressEvent::Error { asset_id, message } => {
                let prefix = asset_id.map(|id| format!("{}: ", id)).unwrap_or_default();
                self.writeln(&format!("{} {}{}", self.red("[error]"), prefix, message));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON progress reporter, one object per line.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }

    fn write_json(&self, value: &Value) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize an event as a JSON object.
pub fn event_to_json(event: &ProgressEvent) -> Value {
    match event {
        ProgressEvent::BuildStarted { total_assets } => {
            json!({ "event": "build_started", "total_assets": total_assets })
        }
        ProgressEvent::AssetStarted { source, asset_id, disposition } => json!({
            "event": "asset_started",
            "source": source,
            "asset_id": asset_id,
            "disposition": disposition.to_string(),
        }),
        ProgressEvent::AssetCompleted { asset_id, status, duration_ms } => {
            let status_str = match status {
                AssetStatus::Failed(_) => "failed".to_string(),
                other => other.to_string(),
            };
            let mut value = json!({
                "event": "asset_completed",
                "asset_id": asset_id,
                "status": status_str,
                "duration_ms": duration_ms,
            });
            if let AssetStatus::Failed(err) = status {
                value["error"] = json!(err);
            }
            value
        }
        ProgressEvent::BuildCompleted { success, duration_ms, compiled, copied, failed } => json!({
            "event": "build_completed",
            "success": success,
            "duration_ms": duration_ms,
            "compiled": compiled,
            "copied": copied,
            "failed": failed,
        }),
        ProgressEvent::Warning { asset_id, message } => {
            let mut value = json!({ "event": "warning", "message": message });
            if let Some(id) = asset_id {
                value["asset_id"] = json!(id);
            }
            value
        }
        ProgressEvent::Error { asset_id, message } => {
            let mut value = json!({ "event": "error", "message": message });
            if let Some(id) = asset_id {
                value["asset_id"] = json!(id);
            }
            value
        }
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        self.write_json(&event_to_json(&event));
    }
}

/// Progress tracker for aggregating run statistics.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    start_time: Option<Instant>,
    total: usize,
    completed: usize,
    compiled: usize,
    copied: usize,
    failed: usize,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a run.
    pub fn start(&mut self, total_assets: usize) {
        *self = Self { start_time: Some(Instant::now()), total: total_assets, ..Self::default() };
    }

    /// Mark an asset as completed.
    pub fn asset_completed(&mut self, status: &AssetStatus) {
        self.completed += 1;
        match status {
            AssetStatus::Compiled => self.compiled += 1,
            AssetStatus::Copied => self.copied += 1,
            AssetStatus::Planned => {}
            AssetStatus::Failed(_) => self.failed += 1,
        }
    }

    /// Get the elapsed time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }

    /// Get the elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    /// Get the completion percentage.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// Check if every planned asset was processed.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    /// Check if the run was successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Number of compiled assets.
    pub fn compiled(&self) -> usize {
        self.compiled
    }

    /// Number of copied assets.
    pub fn copied(&self) -> usize {
        self.copied
    }

    /// Number of failed assets.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Generate a BuildCompleted event from current state.
    pub fn build_completed_event(&self) -> ProgressEvent {
        ProgressEvent::BuildCompleted {
            success: self.is_success(),
            duration_ms: self.elapsed_ms(),
            compiled: self.compiled,
            copied: self.copied,
            failed: self.failed,
        }
    }
}

/// Format a duration in milliseconds to a human-readable string.
pub fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}
