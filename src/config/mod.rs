//! Configuration module for the asset pipeline
//!
//! Provides types, discovery and loading for the optional `glpack.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
