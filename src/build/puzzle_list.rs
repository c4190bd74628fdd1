//! Puzzle list compiler.
//!
//! Packs the puzzle index (`puzzles/puzzle_list.txt`, one puzzle identifier
//! per line) into the framed binary record the game reads at load time.
//!
//! # Format
//!
//! All integers are little-endian.
//!
//! ```text
//! u32   magic   0x504C5354 (bytes "TSLP")
//! u16   count
//! count times:
//!   u16   length of the path in bytes
//!   [u8]  UTF-8 path "puzzles/<identifier>.bin", no terminator
//! ```
//!
//! Entry order is load order and always matches the order of the lines.

use crate::build::compiler::{AssetCompiler, CompileError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Magic value at the start of every puzzle list.
pub const PUZZLE_LIST_MAGIC: u32 = 0x504C_5354;

/// Error while encoding or decoding a puzzle list.
#[derive(Debug, Error)]
pub enum PuzzleListError {
    /// IO error on the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// More entries than the count field can hold
    #[error("Puzzle list has {0} entries, at most {max} are supported", max = u16::MAX)]
    TooManyEntries(usize),
    /// Encoded path longer than the length field can hold
    #[error("Puzzle path '{path}' is {len} bytes long, at most {max} are supported", max = u16::MAX)]
    EntryTooLong { path: String, len: usize },
    /// Stream does not start with the puzzle list magic
    #[error("Bad magic 0x{0:08X}, not a puzzle list")]
    BadMagic(u32),
    /// Entry is not valid UTF-8
    #[error("Entry {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },
    /// Bytes left over after the last entry
    #[error("{0} trailing bytes after the last entry")]
    TrailingData(usize),
}

/// An ordered list of puzzle resource paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuzzleList {
    entries: Vec<String>,
}

impl PuzzleList {
    /// Create an empty puzzle list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read puzzle identifiers from text, one per line.
    ///
    /// Trailing whitespace is stripped and lines that end up empty are
    /// skipped. Each identifier becomes the entry `puzzles/<identifier>.bin`.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, PuzzleListError> {
        let mut list = Self::new();
        for line in reader.lines() {
            let line = line?;
            let identifier = line.trim_end();
            if !identifier.is_empty() {
                list.push_identifier(identifier);
            }
        }
        Ok(list)
    }

    /// Append the entry for a puzzle identifier.
    pub fn push_identifier(&mut self, identifier: &str) {
        self.entries.push(puzzle_path(identifier));
    }

    /// Resource paths in load order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the binary record.
    pub fn encode<W: Write>(&self, mut output: W) -> Result<(), PuzzleListError> {
        let count = u16::try_from(self.entries.len())
            .map_err(|_| PuzzleListError::TooManyEntries(self.entries.len()))?;

        output.write_u32::<LittleEndian>(PUZZLE_LIST_MAGIC)?;
        output.write_u16::<LittleEndian>(count)?;

        for entry in &self.entries {
            let bytes = entry.as_bytes();
            let len = u16::try_from(bytes.len())
                .map_err(|_| PuzzleListError::EntryTooLong { path: entry.clone(), len: bytes.len() })?;
            output.write_u16::<LittleEndian>(len)?;
            output.write_all(bytes)?;
        }

        Ok(())
    }

    /// Encode into a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PuzzleListError> {
        let mut bytes = Vec::with_capacity(6 + self.entries.iter().map(|e| e.len() + 2).sum::<usize>());
        self.encode(&mut bytes)?;
        Ok(bytes)
    }

    /// Read a binary record back.
    ///
    /// The whole stream must be consumed by the record.
    pub fn decode<R: Read>(mut input: R) -> Result<Self, PuzzleListError> {
        let magic = input.read_u32::<LittleEndian>()?;
        if magic != PUZZLE_LIST_MAGIC {
            return Err(PuzzleListError::BadMagic(magic));
        }

        let count = input.read_u16::<LittleEndian>()? as usize;
        let mut entries = Vec::with_capacity(count);
        for index in 0..count {
            let len = input.read_u16::<LittleEndian>()? as usize;
            let mut bytes = vec![0u8; len];
            input.read_exact(&mut bytes)?;
            let entry = String::from_utf8(bytes).map_err(|_| PuzzleListError::InvalidUtf8 { index })?;
            entries.push(entry);
        }

        let mut rest = Vec::new();
        input.read_to_end(&mut rest)?;
        if !rest.is_empty() {
            return Err(PuzzleListError::TrailingData(rest.len()));
        }

        Ok(Self { entries })
    }
}

/// Resource path the game loads for a puzzle identifier.
pub fn puzzle_path(identifier: &str) -> String {
    format!("puzzles/{}.bin", identifier)
}

/// Compile a puzzle index text stream straight into the binary record.
pub fn compile_puzzle_list<R: BufRead, W: Write>(input: R, output: W) -> Result<usize, PuzzleListError> {
    let list = PuzzleList::parse(input)?;
    list.encode(output)?;
    Ok(list.len())
}

/// [`AssetCompiler`] wrapper so the puzzle index goes through the same
/// interface as the external compilers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PuzzleListCompiler;

impl AssetCompiler for PuzzleListCompiler {
    fn name(&self) -> &str {
        "puzzle-list"
    }

    fn compile(
        &self,
        source: &mut dyn BufRead,
        _asset_root: &Path,
        output: &mut dyn Write,
    ) -> Result<(), CompileError> {
        compile_puzzle_list(source, output)
            .map(|_| ())
            .map_err(|e| CompileError::Failed { compiler: self.name().to_string(), message: e.to_string() })
    }
}
