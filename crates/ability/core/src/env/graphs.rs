use std::collections::BTreeMap;
use std::sync::Arc;

use crate::graph::{AbilityGraph, AbilityGraphAsset, GraphLoadError};
use crate::ids::SkillId;

/// Asset/table lookup of ability graphs by skill id.
pub trait GraphOracle: Send + Sync {
    fn ability_graph(&self, skill: SkillId) -> Option<Arc<AbilityGraph>>;
}

/// In-memory graph table.
#[derive(Clone, Debug, Default)]
pub struct GraphCatalog {
    graphs: BTreeMap<SkillId, Arc<AbilityGraph>>,
}

impl GraphCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a validated graph, replacing any graph for the same skill.
    pub fn insert(&mut self, graph: AbilityGraph) -> Option<Arc<AbilityGraph>> {
        self.graphs.insert(graph.skill(), Arc::new(graph))
    }

    /// Validates and inserts an authored graph.
    ///
    /// # Errors
    ///
    /// Returns the structural error; the catalog is left unchanged.
    pub fn load(&mut self, asset: AbilityGraphAsset) -> Result<SkillId, GraphLoadError> {
        let graph = AbilityGraph::try_from(asset)?;
        let skill = graph.skill();
        self.insert(graph);
        Ok(skill)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn contains(&self, skill: SkillId) -> bool {
        self.graphs.contains_key(&skill)
    }

    pub fn skills(&self) -> impl Iterator<Item = SkillId> + '_ {
        self.graphs.keys().copied()
    }
}

impl GraphOracle for GraphCatalog {
    fn ability_graph(&self, skill: SkillId) -> Option<Arc<AbilityGraph>> {
        self.graphs.get(&skill).cloned()
    }
}
