//! Content loaders for reading ability data from files.
//!
//! Each loader turns one file format into `ability-core` values. The
//! [`ContentFactory`] ties them to a conventional data directory layout.

pub mod config;
pub mod factory;
pub mod graph;

pub use config::ConfigLoader;
pub use factory::ContentFactory;
pub use graph::{AbilityCatalog, GraphLoader};

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
