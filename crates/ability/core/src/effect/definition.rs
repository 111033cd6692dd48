use bitflags::bitflags;

use crate::attribute::{AttributeKind, ModifierOp};
use crate::magnitude::Magnitude;
use crate::tag::{GameplayTag, TagSet};

// ============================================================================
// Duration & Flags
// ============================================================================

/// Lifetime of an applied effect. Durations are authored in seconds.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DurationPolicy {
    /// Mutates base values once and is discarded.
    #[default]
    Instant,
    /// Expires after the resolved number of seconds.
    HasDuration(Magnitude),
    /// Lives until explicitly cancelled.
    Infinite,
}

impl DurationPolicy {
    pub fn seconds(seconds: f32) -> Self {
        Self::HasDuration(Magnitude::FixedValue(seconds))
    }

    pub fn is_instant(&self) -> bool {
        matches!(self, Self::Instant)
    }
}

bitflags! {
    /// Behaviour switches of an effect definition.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct EffectFlags: u8 {
        /// Fires the periodic port every `period`.
        const IS_PERIODIC            = 1 << 0;
        /// Also fires one periodic tick at application.
        const EXECUTE_ON_APPLICATION = 1 << 1;
        /// Removed when the ability run that applied it ends.
        const CANCEL_ON_ABILITY_END  = 1 << 2;
    }
}

// ============================================================================
// Stacking
// ============================================================================

/// Which existing instance an application aggregates into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StackType {
    /// Every application creates its own instance.
    #[default]
    None,
    /// One instance per (definition, source unit).
    AggregateBySource,
    /// One instance per definition, whoever applied it.
    AggregateByTarget,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StackPolicy {
    pub stack_type: StackType,
    /// Applications beyond this count are dropped.
    pub limit: u32,
    pub refresh_duration_on_stack: bool,
}

impl Default for StackPolicy {
    fn default() -> Self {
        Self {
            stack_type: StackType::None,
            limit: 1,
            refresh_duration_on_stack: true,
        }
    }
}

// ============================================================================
// Tags & Modifiers
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectTags {
    /// Identity tags, queried by `cancel_effects_with_tags`.
    pub asset: TagSet,
    /// Target must own all of these for the effect to apply.
    pub activation_required: TagSet,
    /// Target must own none of these for the effect to apply.
    pub activation_blocked: TagSet,
    /// Granted to the target while the instance lives.
    pub activation_owned: TagSet,
    /// The instance is cancelled as soon as the target owns any of these.
    pub ongoing_blocked: TagSet,
}

/// One authored attribute modification.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModifierSpec {
    pub attribute: AttributeKind,
    pub op: ModifierOp,
    pub magnitude: Magnitude,
    /// Multiplies the resolved magnitude. Damage nodes author `-1`.
    #[cfg_attr(feature = "serde", serde(default = "default_coefficient"))]
    pub coefficient: f32,
}

#[cfg(feature = "serde")]
fn default_coefficient() -> f32 {
    1.0
}

impl ModifierSpec {
    pub fn new(attribute: AttributeKind, op: ModifierOp, magnitude: impl Into<Magnitude>) -> Self {
        Self {
            attribute,
            op,
            magnitude: magnitude.into(),
            coefficient: 1.0,
        }
    }

    pub fn with_coefficient(mut self, coefficient: f32) -> Self {
        self.coefficient = coefficient;
        self
    }
}

// ============================================================================
// Effect Definition
// ============================================================================

/// Immutable effect template.
///
/// `id` is the stacking identity: two applications aggregate only when their
/// definitions share an id.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EffectDefinition {
    pub id: String,
    pub duration: DurationPolicy,
    /// Seconds between periodic ticks.
    pub period: Option<Magnitude>,
    pub flags: EffectFlags,
    pub stacking: StackPolicy,
    pub tags: EffectTags,
    pub modifiers: Vec<ModifierSpec>,
}

impl EffectDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, duration: DurationPolicy) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_period(mut self, seconds: f32) -> Self {
        self.period = Some(Magnitude::FixedValue(seconds));
        self.flags |= EffectFlags::IS_PERIODIC;
        self
    }

    pub fn with_flags(mut self, flags: EffectFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_stacking(mut self, stack_type: StackType, limit: u32) -> Self {
        self.stacking.stack_type = stack_type;
        self.stacking.limit = limit.max(1);
        self
    }

    pub fn with_modifier(mut self, modifier: ModifierSpec) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn granting(mut self, tag: impl Into<GameplayTag>) -> Self {
        self.tags.activation_owned.add(tag.into());
        self
    }

    pub fn is_periodic(&self) -> bool {
        self.flags.contains(EffectFlags::IS_PERIODIC) && self.period.is_some()
    }

    pub fn has_modifiers(&self) -> bool {
        !self.modifiers.is_empty()
    }
}
