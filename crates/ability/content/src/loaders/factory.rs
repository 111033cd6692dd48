//! Content factory for building runtime inputs from data files.

use std::path::{Path, PathBuf};

use ability_core::{GraphCatalog, RuntimeConfig};

use crate::loaders::{ConfigLoader, GraphLoader, LoadResult};

/// Content factory that loads all ability content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── config.toml
/// └── abilities/
///     ├── warrior.ron
///     └── mage.ron
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    /// Creates a new content factory pointing to a data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Load runtime configuration from `config.toml`.
    ///
    /// A missing file yields the default configuration.
    pub fn load_config(&self) -> LoadResult<RuntimeConfig> {
        let path = self.data_dir.join("config.toml");
        if !path.exists() {
            return Ok(RuntimeConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Load and validate every catalog under `abilities/`.
    pub fn load_graphs(&self) -> LoadResult<GraphCatalog> {
        GraphLoader::load_dir(&self.abilities_dir())
    }

    /// Load a single catalog from `abilities/{name}.ron`.
    pub fn load_catalog(&self, name: &str) -> LoadResult<GraphCatalog> {
        let path = self.abilities_dir().join(format!("{}.ron", name));
        let mut catalog = GraphCatalog::new();
        GraphLoader::load_into(&path, &mut catalog)?;
        Ok(catalog)
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn abilities_dir(&self) -> PathBuf {
        self.data_dir.join("abilities")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_paths() {
        let factory = ContentFactory::new("/tmp/data");
        assert_eq!(factory.data_dir(), Path::new("/tmp/data"));
        assert_eq!(factory.abilities_dir(), Path::new("/tmp/data/abilities"));
    }
}
