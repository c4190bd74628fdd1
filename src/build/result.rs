//! Build result types.
//!
//! Contains types for representing the outcome of a pipeline run.

use crate::build::Disposition;
use std::path::PathBuf;
use std::time::Duration;

/// Outcome for a single asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetStatus {
    /// Written by a compiler
    Compiled,
    /// Copied verbatim
    Copied,
    /// Dry run, nothing written
    Planned,
    /// Processing failed with error
    Failed(String),
}

impl AssetStatus {
    /// Status for a successful run of the given disposition.
    pub fn done(disposition: Disposition) -> Self {
        if disposition.is_compiled() {
            AssetStatus::Compiled
        } else {
            AssetStatus::Copied
        }
    }

    /// Check if the status indicates success.
    pub fn is_success(&self) -> bool {
        !self.is_failure()
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, AssetStatus::Failed(_))
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetStatus::Compiled => write!(f, "compiled"),
            AssetStatus::Copied => write!(f, "copied"),
            AssetStatus::Planned => write!(f, "planned"),
            AssetStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of processing a single asset.
#[derive(Debug, Clone)]
pub struct AssetResult {
    /// Destination path relative to the target directory
    pub asset_id: String,
    /// Absolute source path
    pub source: PathBuf,
    /// Absolute output path
    pub output: PathBuf,
    /// How the asset was handled
    pub disposition: Disposition,
    /// Outcome
    pub status: AssetStatus,
    /// Bytes written to the output file
    pub bytes_written: u64,
    /// Processing time
    pub duration: Duration,
}

impl AssetResult {
    /// Create a successful result.
    pub fn success(
        asset_id: String,
        source: PathBuf,
        output: PathBuf,
        disposition: Disposition,
        bytes_written: u64,
        duration: Duration,
    ) -> Self {
        Self {
            asset_id,
            source,
            output,
            disposition,
            status: AssetStatus::done(disposition),
            bytes_written,
            duration,
        }
    }

    /// Create a dry-run result.
    pub fn planned(asset_id: String, source: PathBuf, output: PathBuf, disposition: Disposition) -> Self {
        Self {
            asset_id,
            source,
            output,
            disposition,
            status: AssetStatus::Planned,
            bytes_written: 0,
            duration: Duration::ZERO,
        }
    }

    /// Create a failed result.
    pub fn failed(
        asset_id: String,
        source: PathBuf,
        output: PathBuf,
        disposition: Disposition,
        error: String,
        duration: Duration,
    ) -> Self {
        Self {
            asset_id,
            source,
            output,
            disposition,
            status: AssetStatus::Failed(error),
            bytes_written: 0,
            duration,
        }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each asset, in processing order
    pub assets: Vec<AssetResult>,
    /// Total run duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset result.
    pub fn add_result(&mut self, result: AssetResult) {
        self.assets.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Number of assets written by a compiler.
    pub fn compiled_count(&self) -> usize {
        self.assets.iter().filter(|r| r.status == AssetStatus::Compiled).count()
    }

    /// Number of assets copied verbatim.
    pub fn copied_count(&self) -> usize {
        self.assets.iter().filter(|r| r.status == AssetStatus::Copied).count()
    }

    /// Number of assets only planned (dry run).
    pub fn planned_count(&self) -> usize {
        self.assets.iter().filter(|r| r.status == AssetStatus::Planned).count()
    }

    /// Number of failed assets.
    pub fn failed_count(&self) -> usize {
        self.assets.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the run succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Total bytes written.
    pub fn bytes_written(&self) -> u64 {
        self.assets.iter().map(|r| r.bytes_written).sum()
    }

    /// All output paths, in processing order.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.assets.iter().filter(|r| r.is_success()).map(|r| &r.output).collect()
    }

    /// Failed asset results.
    pub fn failures(&self) -> Vec<&AssetResult> {
        self.assets.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let total = self.assets.len();

        if !self.is_success() {
            lines.push(format!(
                "Build failed: {} compiled, {} copied, {} failed ({} total)",
                self.compiled_count(),
                self.copied_count(),
                self.failed_count(),
                total
            ));
            for asset in self.failures() {
                lines.push(format!("  - {}: {}", asset.asset_id, asset.status));
            }
        } else if self.planned_count() > 0 {
            lines.push(format!("Dry run: {} assets planned, nothing written", self.planned_count()));
        } else {
            lines.push(format!(
                "Build succeeded: {} compiled, {} copied ({} total, {} bytes) in {:?}",
                self.compiled_count(),
                self.copied_count(),
                total,
                self.bytes_written(),
                self.total_duration
            ));
        }

        lines.join("\n")
    }
}
