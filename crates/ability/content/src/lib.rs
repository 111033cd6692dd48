//! Data-driven ability content and loaders.
//!
//! This crate reads authored content files into `ability-core` types:
//! - Ability graph catalogs (data-driven via RON)
//! - Runtime configuration (data-driven via TOML)
//!
//! Loaded graphs are validated and collected into a [`GraphCatalog`], which
//! the runtime consumes as its graph oracle. Content never appears in runtime
//! state.
//!
//! [`GraphCatalog`]: ability_core::GraphCatalog

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{AbilityCatalog, ConfigLoader, ContentFactory, GraphLoader, LoadResult};
