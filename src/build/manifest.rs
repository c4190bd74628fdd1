//! Asset manifest parsing.
//!
//! A manifest lists the source assets that enter a build as glob patterns,
//! one per line, relative to the asset root:
//!
//! ```text
//! maps/*.tmx
//! sprites/**/*.png
//! -maps/debug_*.tmx
//! ```
//!
//! Lines starting with `-` are exclusions, every other non-blank line is an
//! inclusion. Blank lines are ignored. Line order only decides which set a
//! pattern populates, never the outcome of the set algebra.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix marking an exclusion pattern.
pub const EXCLUSION_PREFIX: char = '-';

/// Error while reading or parsing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file could not be opened or read
    #[error("Failed to read manifest '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// IO error while reading from a stream
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    /// A line consisting only of the exclusion prefix
    #[error("Line {line}: exclusion without a pattern")]
    EmptyPattern { line: usize },
}

/// Whether a manifest line adds files to the build or removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Include,
    Exclude,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Include => write!(f, "include"),
            Polarity::Exclude => write!(f, "exclude"),
        }
    }
}

/// A single classified manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    /// Glob pattern relative to the asset root (without the `-` prefix)
    pub pattern: String,
    /// Inclusion or exclusion
    pub polarity: Polarity,
    /// 1-based line number in the manifest
    pub line_number: usize,
}

impl ManifestLine {
    /// Classify a raw manifest line.
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn parse(raw: &str, line_number: usize) -> Result<Option<Self>, ManifestError> {
        let line = raw.trim_end();
        if line.trim_start().is_empty() {
            return Ok(None);
        }

        let (pattern, polarity) = match line.strip_prefix(EXCLUSION_PREFIX) {
            Some(rest) => (rest, Polarity::Exclude),
            None => (line, Polarity::Include),
        };

        if pattern.trim().is_empty() {
            return Err(ManifestError::EmptyPattern { line: line_number });
        }

        Ok(Some(Self { pattern: pattern.to_string(), polarity, line_number }))
    }

    /// Check if this line is an inclusion.
    pub fn is_include(&self) -> bool {
        self.polarity == Polarity::Include
    }

    /// Check if this line is an exclusion.
    pub fn is_exclude(&self) -> bool {
        self.polarity == Polarity::Exclude
    }
}

/// An ordered list of manifest lines.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    lines: Vec<ManifestLine>,
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a manifest from a buffered reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, ManifestError> {
        let mut lines = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            if let Some(parsed) = ManifestLine::parse(&line?, index + 1)? {
                lines.push(parsed);
            }
        }
        Ok(Self { lines })
    }

    /// Parse a manifest from a string.
    pub fn parse_str(content: &str) -> Result<Self, ManifestError> {
        Self::parse(content.as_bytes())
    }

    /// Load a manifest file.
    ///
    /// The file is read completely before anything else happens, so an
    /// unreadable manifest aborts a build before the output is touched.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let read_err = |source| ManifestError::Read { path: path.to_path_buf(), source };
        let file = File::open(path).map_err(read_err)?;
        Self::parse(BufReader::new(file)).map_err(|e| match e {
            ManifestError::Io(source) => read_err(source),
            other => other,
        })
    }

    /// Append a line to the manifest.
    pub fn push(&mut self, line: ManifestLine) {
        self.lines.push(line);
    }

    /// All lines in manifest order.
    pub fn lines(&self) -> &[ManifestLine] {
        &self.lines
    }

    /// Inclusion lines in manifest order.
    pub fn inclusions(&self) -> impl Iterator<Item = &ManifestLine> {
        self.lines.iter().filter(|l| l.is_include())
    }

    /// Exclusion lines in manifest order.
    pub fn exclusions(&self) -> impl Iterator<Item = &ManifestLine> {
        self.lines.iter().filter(|l| l.is_exclude())
    }

    /// Number of non-blank lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the manifest has no patterns.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
