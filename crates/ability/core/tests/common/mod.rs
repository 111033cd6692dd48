//! Shared fixtures for ability-core integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use ability_core::graph::{AbilityNodeData, NodeKind, TargetShape};
use ability_core::{
    AbilityGraphAsset, AbilityRuntime, AbilitySystemComponent, AnimationHandle, AnimationOracle,
    AttributeKind, Attributes, CueHandle, CueOracle, CueRequest, GraphCatalog, RuntimeConfig,
    RuntimeEvent, SkillId, TagSet, TargetingOracle, UnitId,
};

pub const CASTER: UnitId = UnitId(1);
pub const ENEMY: UnitId = UnitId(2);
pub const BYSTANDER: UnitId = UnitId(3);

pub const ROOT: &str = "root";

// ============================================================================
// Recording oracles
// ============================================================================

#[derive(Debug, Default)]
pub struct RecordingCues {
    pub played: Mutex<Vec<(CueHandle, CueRequest)>>,
    pub stopped: Mutex<Vec<CueHandle>>,
}

impl RecordingCues {
    pub fn played_assets(&self) -> Vec<String> {
        self.played
            .lock()
            .expect("cue log poisoned")
            .iter()
            .map(|(_, request)| request.asset.clone())
            .collect()
    }

    pub fn played_count(&self) -> usize {
        self.played.lock().expect("cue log poisoned").len()
    }

    pub fn stopped_count(&self) -> usize {
        self.stopped.lock().expect("cue log poisoned").len()
    }
}

impl CueOracle for RecordingCues {
    fn play_cue(&self, handle: CueHandle, request: &CueRequest) {
        self.played
            .lock()
            .expect("cue log poisoned")
            .push((handle, request.clone()));
    }

    fn stop_cue(&self, handle: CueHandle) {
        self.stopped.lock().expect("cue log poisoned").push(handle);
    }
}

#[derive(Debug, Default)]
pub struct RecordingAnimations {
    pub played: Mutex<Vec<(UnitId, String, bool)>>,
    pub stopped: Mutex<Vec<AnimationHandle>>,
}

impl AnimationOracle for RecordingAnimations {
    fn play_animation(&self, unit: UnitId, animation: &str, looping: bool) -> AnimationHandle {
        let mut played = self.played.lock().expect("animation log poisoned");
        played.push((unit, animation.to_owned(), looping));
        AnimationHandle(played.len() as u64)
    }

    fn stop_animation(&self, handle: AnimationHandle) {
        self.stopped
            .lock()
            .expect("animation log poisoned")
            .push(handle);
    }
}

/// Returns a fixed unit list for every search.
#[derive(Debug, Default)]
pub struct FixedTargeting {
    pub targets: Vec<UnitId>,
    pub searches: Mutex<Vec<TargetShape>>,
}

impl FixedTargeting {
    pub fn new(targets: impl IntoIterator<Item = UnitId>) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            searches: Mutex::new(Vec::new()),
        }
    }
}

impl TargetingOracle for FixedTargeting {
    fn find_targets(
        &self,
        _origin: UnitId,
        shape: &TargetShape,
        _tag_filter: &TagSet,
    ) -> Vec<UnitId> {
        self.searches.lock().expect("search log poisoned").push(*shape);
        self.targets.clone()
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn combatant(unit: UnitId) -> AbilitySystemComponent {
    AbilitySystemComponent::new(unit).with_attributes(Attributes::from_values([
        (AttributeKind::MaxHealth, 100.0),
        (AttributeKind::Health, 100.0),
        (AttributeKind::MaxMana, 50.0),
        (AttributeKind::Mana, 50.0),
        (AttributeKind::Attack, 20.0),
        (AttributeKind::Defense, 5.0),
    ]))
}

/// Routes runtime logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Runtime with a caster, an enemy and a bystander at full health.
pub fn arena(config: RuntimeConfig) -> AbilityRuntime {
    init_tracing();
    let mut runtime = AbilityRuntime::new(config).with_seed(7);
    runtime.add_unit(combatant(CASTER));
    runtime.add_unit(combatant(ENEMY));
    runtime.add_unit(combatant(BYSTANDER));
    runtime
}

/// Graph asset whose root node is `root`.
pub fn ability(root: AbilityNodeData) -> AbilityGraphAsset {
    AbilityGraphAsset::new(root.id).node(ROOT, NodeKind::Ability(root))
}

pub fn catalog(assets: impl IntoIterator<Item = AbilityGraphAsset>) -> GraphCatalog {
    let mut catalog = GraphCatalog::new();
    for asset in assets {
        catalog.load(asset).expect("test graph should load");
    }
    catalog
}

pub fn health(runtime: &AbilityRuntime, unit: UnitId) -> f32 {
    attribute(runtime, unit, AttributeKind::Health)
}

pub fn attribute(runtime: &AbilityRuntime, unit: UnitId, kind: AttributeKind) -> f32 {
    runtime
        .unit(unit)
        .and_then(|asc| asc.attributes().get_current_value(kind))
        .expect("attribute should exist")
}

/// Nodes executed for `skill`, in journal order.
pub fn executed_nodes(events: &[RuntimeEvent], skill: SkillId) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            RuntimeEvent::NodeExecuted {
                skill: executed,
                node,
                ..
            } if *executed == skill => Some(node.to_string()),
            _ => None,
        })
        .collect()
}
