//! Runtime configuration loader.

use std::path::Path;

use ability_core::RuntimeConfig;
use tracing::debug;

use crate::loaders::{LoadResult, read_file};

/// Loader for runtime configuration from TOML files.
///
/// Every key is optional; missing keys keep their
/// [`SkillConstants`](ability_core::SkillConstants) default.
///
/// ```toml
/// fps = 60
/// max_execution_depth = 32
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a [`RuntimeConfig`] from a TOML file.
    pub fn load(path: &Path) -> LoadResult<RuntimeConfig> {
        let content = read_file(path)?;
        let config = Self::parse(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse config TOML at {}: {}", path.display(), e)
        })?;
        debug!(path = %path.display(), fps = config.fps, "runtime config loaded");
        Ok(config)
    }

    /// Parse a [`RuntimeConfig`] from TOML text.
    ///
    /// A zero `fps` is rejected since no duration could be converted to
    /// frames.
    pub fn parse(content: &str) -> LoadResult<RuntimeConfig> {
        let config: RuntimeConfig = toml::from_str(content)?;
        anyhow::ensure!(config.fps > 0, "fps must be positive");
        Ok(config)
    }
}
