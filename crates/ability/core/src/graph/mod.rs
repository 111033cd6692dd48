//! Ability definition graphs.
//!
//! An ability is authored as a directed graph of typed nodes whose named
//! output ports connect to other nodes' inputs. The authored form,
//! [`AbilityGraphAsset`], is validated into an immutable [`AbilityGraph`]:
//!
//! - node guids are unique
//! - exactly one `Ability` node exists and its id matches the asset's skill
//! - dangling connections are reported and kept; traversal skips them
//!
//! Structural errors reject the whole graph.

mod node;
pub mod ports;

pub use node::{
    AbilityNodeData, AbilityTags, AnimationTaskData, Comparison, ConditionNodeData, CostSpec,
    CueKind, CueNodeData, EffectNodeData, EffectNodeKind, EffectTarget, NodeData, NodeKind,
    SearchTargetsData, TargetShape, TaskNodeData, TimeCueData, TimeEffectData,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::effect::EffectDefinition;
use crate::error::{ErrorSeverity, RuntimeError};
use crate::ids::{NodeGuid, SkillId};

/// Edge from `(output_node, output_port)` to `input_node`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    pub output_node: NodeGuid,
    pub output_port: String,
    pub input_node: NodeGuid,
}

impl Connection {
    pub fn new(
        output_node: impl Into<NodeGuid>,
        output_port: impl Into<String>,
        input_node: impl Into<NodeGuid>,
    ) -> Self {
        Self {
            output_node: output_node.into(),
            output_port: output_port.into(),
            input_node: input_node.into(),
        }
    }
}

/// Authored, unvalidated graph as stored in content files.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityGraphAsset {
    pub skill: SkillId,
    pub nodes: Vec<NodeData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub connections: Vec<Connection>,
}

impl AbilityGraphAsset {
    pub fn new(skill: SkillId) -> Self {
        Self {
            skill,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn node(mut self, guid: impl Into<NodeGuid>, kind: NodeKind) -> Self {
        self.nodes.push(NodeData::new(guid, kind));
        self
    }

    pub fn connect(
        mut self,
        output_node: impl Into<NodeGuid>,
        output_port: impl Into<String>,
        input_node: impl Into<NodeGuid>,
    ) -> Self {
        self.connections
            .push(Connection::new(output_node, output_port, input_node));
        self
    }

    /// Validates into an executable graph.
    ///
    /// # Errors
    ///
    /// See [`GraphLoadError`].
    pub fn build(self) -> Result<AbilityGraph, GraphLoadError> {
        AbilityGraph::try_from(self)
    }
}

/// Structural error that rejects a whole graph.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GraphLoadError {
    #[error("graph for {skill} contains node '{guid}' more than once")]
    DuplicateNode { skill: SkillId, guid: NodeGuid },

    #[error("graph for {skill} has no Ability node")]
    MissingRoot { skill: SkillId },

    #[error("graph for {skill} has {count} Ability nodes")]
    MultipleRoots { skill: SkillId, count: usize },

    #[error("graph for {skill} has an Ability node declaring {declared}")]
    RootIdMismatch { skill: SkillId, declared: SkillId },
}

impl RuntimeError for GraphLoadError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateNode { .. } => "GRAPH_DUPLICATE_NODE",
            Self::MissingRoot { .. } => "GRAPH_MISSING_ROOT",
            Self::MultipleRoots { .. } => "GRAPH_MULTIPLE_ROOTS",
            Self::RootIdMismatch { .. } => "GRAPH_ROOT_ID_MISMATCH",
        }
    }
}

/// Validated, immutable ability graph.
#[derive(Clone, Debug)]
pub struct AbilityGraph {
    skill: SkillId,
    root: NodeGuid,
    nodes: BTreeMap<NodeGuid, NodeData>,
    /// `(node, port)` → targets, in authored connection order.
    outgoing: BTreeMap<(NodeGuid, String), Vec<NodeGuid>>,
    /// Effective effect definitions of Effect nodes.
    effects: BTreeMap<NodeGuid, Arc<EffectDefinition>>,
    dangling: usize,
}

impl AbilityGraph {
    pub fn skill(&self) -> SkillId {
        self.skill
    }

    pub fn root_guid(&self) -> &NodeGuid {
        &self.root
    }

    pub fn root(&self) -> Option<&AbilityNodeData> {
        match self.nodes.get(&self.root).map(|node| &node.kind) {
            Some(NodeKind::Ability(data)) => Some(data),
            _ => None,
        }
    }

    pub fn node(&self, guid: &NodeGuid) -> Option<&NodeData> {
        self.nodes.get(guid)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.nodes.values()
    }

    /// Targets connected to `(node, port)`, in authored order.
    pub fn connected(&self, node: &NodeGuid, port: &str) -> &[NodeGuid] {
        self.outgoing
            .get(&(node.clone(), port.to_owned()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn effect_definition(&self, node: &NodeGuid) -> Option<&Arc<EffectDefinition>> {
        self.effects.get(node)
    }

    /// Number of connections referencing unknown nodes.
    pub fn dangling_connections(&self) -> usize {
        self.dangling
    }
}

impl TryFrom<AbilityGraphAsset> for AbilityGraph {
    type Error = GraphLoadError;

    fn try_from(asset: AbilityGraphAsset) -> Result<Self, Self::Error> {
        let skill = asset.skill;
        let mut nodes = BTreeMap::new();
        let mut roots = Vec::new();

        for node in asset.nodes {
            if let NodeKind::Ability(data) = &node.kind {
                if data.id != skill {
                    return Err(GraphLoadError::RootIdMismatch {
                        skill,
                        declared: data.id,
                    });
                }
                roots.push(node.guid.clone());
            }
            if nodes.contains_key(&node.guid) {
                return Err(GraphLoadError::DuplicateNode {
                    skill,
                    guid: node.guid,
                });
            }
            nodes.insert(node.guid.clone(), node);
        }

        let root = match roots.len() {
            0 => return Err(GraphLoadError::MissingRoot { skill }),
            1 => roots.remove(0),
            count => return Err(GraphLoadError::MultipleRoots { skill, count }),
        };

        let mut outgoing: BTreeMap<(NodeGuid, String), Vec<NodeGuid>> = BTreeMap::new();
        let mut dangling = 0;
        for connection in asset.connections {
            let known_output = nodes.contains_key(&connection.output_node);
            let known_input = nodes.contains_key(&connection.input_node);
            if !known_output || !known_input {
                warn!(
                    %skill,
                    output = %connection.output_node,
                    port = %connection.output_port,
                    input = %connection.input_node,
                    "dangling connection kept, it will be skipped at traversal"
                );
                dangling += 1;
            }
            outgoing
                .entry((connection.output_node, connection.output_port))
                .or_default()
                .push(connection.input_node);
        }

        let effects = nodes
            .values()
            .filter_map(|node| match &node.kind {
                NodeKind::Effect(data) => Some((
                    node.guid.clone(),
                    Arc::new(data.build_definition(skill, &node.guid)),
                )),
                _ => None,
            })
            .collect();

        Ok(Self {
            skill,
            root,
            nodes,
            outgoing,
            effects,
            dangling,
        })
    }
}
