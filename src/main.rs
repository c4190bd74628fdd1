//! glpack - Command-line tool for building the game's runtime asset tree

use std::process::ExitCode;

use glpack::cli;

fn main() -> ExitCode {
    cli::run()
}
