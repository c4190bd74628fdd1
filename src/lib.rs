//! glpack - Manifest-driven asset build pipeline
//!
//! This library provides functionality to:
//! - Resolve a manifest of glob patterns (inclusions minus exclusions) against an asset root
//! - Route each file to the map, puzzle or puzzle-list compiler, or copy it verbatim
//! - Encode and decode the binary puzzle list index
//! - Wipe and rebuild the output tree the game loads at runtime

pub mod build;
pub mod cli;
pub mod config;
