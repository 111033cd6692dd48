use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::cooldown::CooldownSpec;
use crate::graph::AbilityTags;
use crate::ids::{EffectHandle, RunId, SkillId, UnitId};
use crate::tag::TagSet;

/// Lifecycle state of a granted ability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbilityState {
    #[default]
    Inactive,
    Active,
    /// Finished through an EndAbility node or [`end_ability`](crate::AbilityRuntime::end_ability).
    Ended,
    /// Cancelled externally or by an ongoing-blocked tag.
    Cancelled,
}

impl AbilityState {
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Bookkeeping of one activation.
///
/// Everything the run grants or applies "for as long as it lasts" is recorded
/// here so ending the run can unwind it.
#[derive(Clone, Debug)]
pub struct AbilityRun {
    pub id: RunId,
    pub context: Arc<ExecutionContext>,
    /// Snapshot of the root node's tags at activation.
    pub tags: AbilityTags,
    /// Tags granted by ApplyTags tasks, per receiving unit.
    pub granted_tags: Vec<(UnitId, TagSet)>,
    /// Stacks of effects flagged `CANCEL_ON_ABILITY_END`, per target unit.
    /// An instance appears once for every stack the run added to it.
    pub dependent_effects: Vec<(UnitId, EffectHandle)>,
}

impl AbilityRun {
    pub fn new(id: RunId, context: Arc<ExecutionContext>, tags: AbilityTags) -> Self {
        Self {
            id,
            context,
            tags,
            granted_tags: Vec::new(),
            dependent_effects: Vec::new(),
        }
    }
}

/// A granted ability bound to one unit. One per unit per skill id.
#[derive(Clone, Debug)]
pub struct AbilitySpec {
    pub skill: SkillId,
    pub owner: UnitId,
    pub level: u32,
    pub state: AbilityState,
    /// Present while `state` is `Active`.
    pub run: Option<AbilityRun>,
    pub activation_count: u32,
    /// Cooldown of the definition as of the last activation. Charge recovery
    /// keeps restarting from it after the run is gone.
    pub cooldown: Option<CooldownSpec>,
}

impl AbilitySpec {
    pub fn new(skill: SkillId, owner: UnitId, level: u32) -> Self {
        Self {
            skill,
            owner,
            level: level.max(1),
            state: AbilityState::Inactive,
            run: None,
            activation_count: 0,
            cooldown: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run.as_ref().map(|run| run.id)
    }
}
