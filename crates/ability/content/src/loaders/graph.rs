//! Ability graph catalog loader.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ability_core::{AbilityGraph, AbilityGraphAsset, GraphCatalog, RuntimeError, SkillId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::loaders::{LoadResult, read_file};

/// Ability catalog structure for RON files.
///
/// ```ron
/// AbilityCatalog(
///     abilities: [
///         (
///             skill: SkillId(100),
///             nodes: [
///                 (guid: "root", kind: Ability((id: SkillId(100), name: "Slash"))),
///                 (guid: "hit", kind: Effect((kind: Damage(amount: FixedValue(30.0))))),
///             ],
///             connections: [
///                 (output_node: "root", output_port: "Out", input_node: "hit"),
///             ],
///         ),
///     ],
/// )
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilityCatalog {
    pub abilities: Vec<AbilityGraphAsset>,
}

/// Loader for ability graphs from RON files.
pub struct GraphLoader;

impl GraphLoader {
    /// Load the authored graphs of one RON catalog file without validating
    /// them.
    pub fn load(path: &Path) -> LoadResult<Vec<AbilityGraphAsset>> {
        let content = read_file(path)?;
        Self::parse(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse ability catalog RON at {}: {}", path.display(), e)
        })
    }

    pub fn parse(content: &str) -> LoadResult<Vec<AbilityGraphAsset>> {
        let catalog: AbilityCatalog = ron::from_str(content)?;
        Ok(catalog.abilities)
    }

    /// Validate every graph of a catalog file and add them to `catalog`.
    ///
    /// The file is all-or-nothing: if any graph fails validation, or declares
    /// a skill that is already in `catalog`, nothing is inserted.
    pub fn load_into(path: &Path, catalog: &mut GraphCatalog) -> LoadResult<Vec<SkillId>> {
        let assets = Self::load(path)?;
        let graphs = validate(assets, catalog)
            .map_err(|e| anyhow::anyhow!("Invalid ability graph in {}: {}", path.display(), e))?;

        let mut skills = Vec::with_capacity(graphs.len());
        for graph in graphs {
            if graph.dangling_connections() > 0 {
                warn!(
                    path = %path.display(),
                    skill = %graph.skill(),
                    dangling = graph.dangling_connections(),
                    "graph has connections to unknown nodes"
                );
            }
            skills.push(graph.skill());
            catalog.insert(graph);
        }
        debug!(path = %path.display(), count = skills.len(), "ability graphs loaded");
        Ok(skills)
    }

    /// Load every `*.ron` file of `dir` into a fresh catalog.
    ///
    /// Files are read in path order so that load failures are reproducible.
    pub fn load_dir(dir: &Path) -> LoadResult<GraphCatalog> {
        let mut catalog = GraphCatalog::new();
        for path in ron_files(dir)? {
            Self::load_into(&path, &mut catalog)?;
        }
        Ok(catalog)
    }
}

fn validate(
    assets: Vec<AbilityGraphAsset>,
    existing: &GraphCatalog,
) -> LoadResult<Vec<AbilityGraph>> {
    let mut seen = BTreeSet::new();
    let mut graphs = Vec::with_capacity(assets.len());
    for asset in assets {
        let skill = asset.skill;
        anyhow::ensure!(
            seen.insert(skill) && !existing.contains(skill),
            "skill {} is defined more than once",
            skill
        );
        let graph = asset
            .build()
            .map_err(|e| anyhow::anyhow!("[{}] {}", e.error_code(), e))?;
        graphs.push(graph);
    }
    Ok(graphs)
}

fn ron_files(dir: &Path) -> LoadResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow::anyhow!("Failed to read directory {}: {}", dir.display(), e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ron") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
