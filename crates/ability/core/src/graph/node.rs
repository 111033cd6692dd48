use crate::attribute::{AttributeKind, ModifierOp};
use crate::cooldown::CooldownSpec;
use crate::effect::{DurationPolicy, EffectDefinition, ModifierSpec};
use crate::ids::{Frames, NodeGuid, SkillId};
use crate::magnitude::Magnitude;
use crate::tag::TagSet;

/// One authored node: identity plus kind-specific data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeData {
    pub guid: NodeGuid,
    pub kind: NodeKind,
}

impl NodeData {
    pub fn new(guid: impl Into<NodeGuid>, kind: NodeKind) -> Self {
        Self {
            guid: guid.into(),
            kind,
        }
    }
}

/// Closed set of node kinds. Each has exactly one execution routine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    Ability(AbilityNodeData),
    Effect(EffectNodeData),
    Task(TaskNodeData),
    Condition(ConditionNodeData),
    Cue(CueNodeData),
}

impl NodeKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ability(_) => "Ability",
            Self::Effect(_) => "Effect",
            Self::Task(_) => "Task",
            Self::Condition(_) => "Condition",
            Self::Cue(_) => "Cue",
        }
    }
}

// ============================================================================
// Ability
// ============================================================================

/// Tag queries and grants of an ability.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AbilityTags {
    /// Identity of the ability.
    pub asset: TagSet,
    /// Running abilities whose asset tags match are cancelled on activation.
    pub cancel_abilities_with_tags: TagSet,
    /// Granted to the owner while the ability runs.
    pub activation_owned: TagSet,
    pub activation_required: TagSet,
    pub activation_blocked: TagSet,
    /// The running ability is cancelled when the owner gains any of these.
    pub ongoing_blocked: TagSet,
}

/// Resource paid on activation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostSpec {
    pub attribute: AttributeKind,
    pub amount: Magnitude,
}

/// Root node of every ability graph.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityNodeData {
    pub id: SkillId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: AbilityTags,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cooldown: Option<CooldownSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cost: Option<CostSpec>,
    /// Re-activation while running cancels the old run instead of failing.
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_replace: bool,
}

impl AbilityNodeData {
    pub fn new(id: SkillId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tags: AbilityTags::default(),
            cooldown: None,
            cost: None,
            allow_replace: false,
        }
    }
}

// ============================================================================
// Effect
// ============================================================================

/// Which unit of the execution context a node acts on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectTarget {
    Caster,
    #[default]
    MainTarget,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectNodeKind {
    /// Subtracts `amount` from Health.
    Damage { amount: Magnitude },
    /// Adds `amount` to Health.
    Heal { amount: Magnitude },
    /// Subtracts `amount` from `attribute`.
    Cost {
        attribute: AttributeKind,
        amount: Magnitude,
    },
    /// The effect definition as authored.
    Buff,
    /// The authored modifiers, always applied instantly.
    AttributeModifier,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectNodeData {
    pub kind: EffectNodeKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: EffectTarget,
    #[cfg_attr(feature = "serde", serde(default))]
    pub effect: EffectDefinition,
}

impl EffectNodeData {
    pub fn new(kind: EffectNodeKind, target: EffectTarget) -> Self {
        Self {
            kind,
            target,
            effect: EffectDefinition::default(),
        }
    }

    pub fn with_effect(mut self, effect: EffectDefinition) -> Self {
        self.effect = effect;
        self
    }

    /// Definition actually applied by the node.
    ///
    /// The kind's own modifier is appended to the authored list and an empty
    /// id becomes `"<skill>/<node>"`.
    pub fn build_definition(&self, skill: SkillId, node: &NodeGuid) -> EffectDefinition {
        let mut definition = self.effect.clone();
        if definition.id.is_empty() {
            definition.id = format!("{skill}/{node}");
        }
        match &self.kind {
            EffectNodeKind::Damage { amount } => definition.modifiers.push(
                ModifierSpec::new(AttributeKind::Health, ModifierOp::Add, amount.clone())
                    .with_coefficient(-1.0),
            ),
            EffectNodeKind::Heal { amount } => definition.modifiers.push(ModifierSpec::new(
                AttributeKind::Health,
                ModifierOp::Add,
                amount.clone(),
            )),
            EffectNodeKind::Cost { attribute, amount } => definition.modifiers.push(
                ModifierSpec::new(*attribute, ModifierOp::Add, amount.clone())
                    .with_coefficient(-1.0),
            ),
            EffectNodeKind::Buff => {}
            EffectNodeKind::AttributeModifier => definition.duration = DurationPolicy::Instant,
        }
        definition
    }
}

// ============================================================================
// Tasks
// ============================================================================

/// Fires `port` once per playthrough when elapsed frames reach
/// `trigger_time`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeEffectData {
    pub port: String,
    pub trigger_time: Frames,
}

/// Opens `port` while elapsed frames are in `[start_time, end_time)`.
///
/// `end_time == -1` keeps the window open until the task ends.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeCueData {
    pub port: String,
    pub start_time: Frames,
    pub end_time: i32,
}

impl TimeCueData {
    pub const UNTIL_TASK_END: i32 = -1;

    /// Fixed closing frame, `None` when the window lasts until task end.
    pub fn end_frame(&self) -> Option<Frames> {
        u32::try_from(self.end_time).ok()
    }

    pub fn contains(&self, elapsed: Frames) -> bool {
        elapsed >= self.start_time && self.end_frame().is_none_or(|end| elapsed < end)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationTaskData {
    pub animation: String,
    pub duration_frames: Frames,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_animation_looping: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_effects: Vec<TimeEffectData>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time_cues: Vec<TimeCueData>,
}

impl AnimationTaskData {
    pub fn new(animation: impl Into<String>, duration_frames: Frames) -> Self {
        Self {
            animation: animation.into(),
            duration_frames,
            is_animation_looping: false,
            time_effects: Vec::new(),
            time_cues: Vec::new(),
        }
    }

    pub fn looping(mut self) -> Self {
        self.is_animation_looping = true;
        self
    }

    pub fn with_time_effect(mut self, port: impl Into<String>, trigger_time: Frames) -> Self {
        self.time_effects.push(TimeEffectData {
            port: port.into(),
            trigger_time,
        });
        self
    }

    pub fn with_time_cue(
        mut self,
        port: impl Into<String>,
        start_time: Frames,
        end_time: i32,
    ) -> Self {
        self.time_cues.push(TimeCueData {
            port: port.into(),
            start_time,
            end_time,
        });
        self
    }
}

/// Search area handed to the targeting oracle. Units are world units.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetShape {
    Circle { radius: f32 },
    Sector { radius: f32, angle: f32 },
    Rectangle { width: f32, length: f32 },
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchTargetsData {
    pub shape: TargetShape,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tag_filter: TagSet,
    #[cfg_attr(feature = "serde", serde(default))]
    pub max_targets: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskNodeData {
    Animation(AnimationTaskData),
    /// Fires `OnComplete` after `seconds`.
    Wait { seconds: f32 },
    EndAbility,
    SearchTargets(SearchTargetsData),
    /// Grants tags for the rest of the run.
    ApplyTags { tags: TagSet, target: EffectTarget },
    /// Removes loose tags (and their descendants).
    RemoveTags { tags: TagSet, target: EffectTarget },
}

// ============================================================================
// Condition
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Comparison {
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    Greater,
}

impl Comparison {
    pub fn compare(self, lhs: f32, rhs: f32) -> bool {
        match self {
            Self::Less => lhs < rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::Equal => lhs == rhs,
            Self::NotEqual => lhs != rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::Greater => lhs > rhs,
        }
    }
}

/// Branches to `"true"` or `"false"`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConditionNodeData {
    AttributeCompare {
        subject: EffectTarget,
        attribute: AttributeKind,
        comparison: Comparison,
        value: Magnitude,
    },
    HasTags {
        subject: EffectTarget,
        tags: TagSet,
        #[cfg_attr(feature = "serde", serde(default))]
        require_all: bool,
    },
    /// Deterministic roll against `probability` in `[0, 1]`.
    Chance { probability: f32 },
}

// ============================================================================
// Cue
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CueKind {
    Particle,
    Sound,
    FloatingText,
}

/// Presentation-only trigger.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CueNodeData {
    pub kind: CueKind,
    pub asset: String,
    /// Floating text payload. May be a formula.
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: Option<Magnitude>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attach_to: EffectTarget,
    /// Seconds until the runtime stops the cue. `None` is fire-and-forget.
    #[cfg_attr(feature = "serde", serde(default))]
    pub duration: Option<f32>,
}

impl CueNodeData {
    pub fn new(kind: CueKind, asset: impl Into<String>) -> Self {
        Self {
            kind,
            asset: asset.into(),
            text: None,
            attach_to: EffectTarget::Caster,
            duration: None,
        }
    }
}
