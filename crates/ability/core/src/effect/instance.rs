use std::sync::Arc;

use super::EffectDefinition;
use crate::attribute::{AttributeKind, ModifierOp};
use crate::context::ExecutionContext;
use crate::ids::{EffectHandle, Frames, NodeGuid, SkillId, UnitId};
use crate::magnitude::MagnitudeContext;
use crate::tag::TagSet;

/// Graph location that applied an effect. Ports fired by the effect
/// (`OnPeriodicTick`, `OnComplete`, ...) resume from this node.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectOrigin {
    pub skill: SkillId,
    pub node: NodeGuid,
    pub context: ExecutionContext,
}

/// Why the runtime applied an effect. Cooldown bookkeeping reacts to the
/// removal of its own effects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectPurpose {
    #[default]
    Gameplay,
    Cooldown(SkillId),
    ChargeRecovery(SkillId),
}

/// A modifier with its magnitude resolved at application, before stack
/// scaling.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedModifier {
    /// Index into the definition's modifier list.
    pub slot: u32,
    pub attribute: AttributeKind,
    pub op: ModifierOp,
    pub magnitude: f32,
}

impl ResolvedModifier {
    /// Magnitude contributed at `stack_count` stacks.
    ///
    /// Add scales linearly, Multiply compounds, Override ignores stacks.
    pub fn scaled(&self, stack_count: u32) -> f32 {
        let stacks = stack_count.max(1);
        match self.op {
            ModifierOp::Add => self.magnitude * stacks as f32,
            ModifierOp::Multiply => self.magnitude.powi(stacks as i32),
            ModifierOp::Override => self.magnitude,
        }
    }
}

/// Fully resolved request to apply an effect to one target.
#[derive(Clone, Debug)]
pub struct EffectApplication {
    pub definition: Arc<EffectDefinition>,
    pub source: UnitId,
    pub target: UnitId,
    pub modifiers: Vec<ResolvedModifier>,
    /// `None` for infinite effects. Ignored for instant effects.
    pub duration: Option<Frames>,
    pub period: Option<Frames>,
    pub magnitudes: MagnitudeContext,
    pub origin: Option<Arc<EffectOrigin>>,
    pub purpose: EffectPurpose,
}

/// An applied duration or infinite effect, owned by the target's
/// [`ActiveEffects`](super::ActiveEffects).
#[derive(Clone, Debug)]
pub struct EffectInstance {
    pub handle: EffectHandle,
    pub definition: Arc<EffectDefinition>,
    /// Non-owning attribution back-reference.
    pub source: UnitId,
    pub target: UnitId,
    pub duration: Option<Frames>,
    pub elapsed: Frames,
    pub period: Option<Frames>,
    pub next_tick_at: Frames,
    pub ticks_fired: u32,
    pub stack_count: u32,
    pub granted_tags: TagSet,
    pub modifiers: Vec<ResolvedModifier>,
    /// True when modifiers are held as attribute modifiers rather than
    /// executed against base values on each period.
    pub modifiers_applied: bool,
    pub magnitudes: MagnitudeContext,
    pub origin: Option<Arc<EffectOrigin>>,
    pub purpose: EffectPurpose,
}

impl EffectInstance {
    pub fn remaining(&self) -> Option<Frames> {
        self.duration.map(|total| total.saturating_sub(self.elapsed))
    }

    pub fn is_infinite(&self) -> bool {
        self.duration.is_none()
    }

    pub fn is_periodic(&self) -> bool {
        self.definition.is_periodic() && self.period.is_some_and(|period| period > 0)
    }

    /// Elapsed frames are reset; the periodic phase restarts.
    pub(crate) fn refresh_duration(&mut self) {
        self.elapsed = 0;
        if let Some(period) = self.period {
            self.next_tick_at = period;
        }
    }
}
