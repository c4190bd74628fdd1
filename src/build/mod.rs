//! Asset build pipeline
//!
//! Turns a manifest of glob patterns into a ready-to-package output tree.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Manifest**: Inclusion and exclusion patterns, one per line
//! - **Discovery**: Resolve patterns against the asset root, `inclusions - exclusions`
//! - **Dispatch**: Route each file to a compiler or the verbatim copy
//! - **Execution**: Wipe the target directory and write every output
//!
//! # Example
//!
//! ```ignore
//! use glpack::build::{BuildContext, BuildPipeline};
//!
//! let context = BuildContext::new(asset_root, target_dir);
//! let pipeline = BuildPipeline::new(context);
//!
//! let result = pipeline.build_file(Path::new("assets.txt"))?;
//! println!("{}", result.summary());
//! ```

pub mod compiler;
pub mod context;
pub mod discovery;
pub mod dispatch;
pub mod manifest;
pub mod output_tree;
pub mod pipeline;
pub mod progress;
pub mod puzzle_list;
pub mod result;
pub mod target;

pub use compiler::{AssetCompiler, CompileError, CompilerSet, ExternalCompiler};
pub use context::*;
pub use discovery::*;
pub use dispatch::{DispatchError, DispatchRule, Dispatcher};
pub use manifest::*;
pub use output_tree::OutputError;
pub use pipeline::*;
pub use puzzle_list::{PuzzleList, PuzzleListCompiler, PuzzleListError};
pub use result::*;
pub use target::*;
