//! Inspect command implementation

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::build::PuzzleList;

/// Run the inspect command
pub fn run_inspect(path: &Path) -> ExitCode {
    if !path.is_file() {
        eprintln!("Error: Not a file: {}", path.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: Cannot open '{}': {}", path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match PuzzleList::decode(BufReader::new(file)) {
        Ok(list) => {
            for entry in list.entries() {
                println!("{}", entry);
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}: {}", path.display(), e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
