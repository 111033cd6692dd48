//! Per-unit ability system component.
//!
//! The component is the only owner of a unit's tags, attributes, active
//! effects, granted abilities and timeline tasks. Other units never reach
//! into it directly; cross-unit work goes through the
//! [`AbilityRuntime`](crate::AbilityRuntime) arena by [`UnitId`].
mod spec;

pub use spec::{AbilityRun, AbilitySpec, AbilityState};

use std::collections::BTreeMap;

use crate::attribute::Attributes;
use crate::cooldown::ChargeState;
use crate::effect::{ActiveEffects, EffectPurpose};
use crate::ids::{Frames, RunId, SkillId, UnitId};
use crate::tag::{GameplayTag, OwnedTags, TagSet};
use crate::timeline::TimelineScheduler;

#[derive(Clone, Debug)]
pub struct AbilitySystemComponent {
    pub(crate) unit: UnitId,
    pub(crate) level: u32,
    pub(crate) tags: OwnedTags,
    pub(crate) attributes: Attributes,
    pub(crate) effects: ActiveEffects,
    pub(crate) abilities: BTreeMap<SkillId, AbilitySpec>,
    pub(crate) charges: BTreeMap<SkillId, ChargeState>,
    pub(crate) timeline: TimelineScheduler,
    /// Set whenever the owned set changes; cleared by the runtime once
    /// ongoing-blocked queries have been re-evaluated.
    tags_dirty: bool,
}

impl AbilitySystemComponent {
    pub fn new(unit: UnitId) -> Self {
        Self {
            unit,
            level: 1,
            tags: OwnedTags::new(),
            attributes: Attributes::new(),
            effects: ActiveEffects::new(),
            abilities: BTreeMap::new(),
            charges: BTreeMap::new(),
            timeline: TimelineScheduler::new(),
            tags_dirty: false,
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn with_loose_tags(
        mut self,
        tags: impl IntoIterator<Item = impl Into<GameplayTag>>,
    ) -> Self {
        for tag in tags {
            self.tags.add_loose(tag.into());
        }
        self
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Effective owned tag set.
    pub fn owned_tags(&self) -> &TagSet {
        self.tags.as_set()
    }

    pub fn tags(&self) -> &OwnedTags {
        &self.tags
    }

    /// Adds a loose tag without re-evaluating running abilities.
    ///
    /// Prefer [`AbilityRuntime::add_loose_tag`](crate::AbilityRuntime::add_loose_tag),
    /// which also cancels whatever the new tag blocks.
    pub fn add_loose_tag(&mut self, tag: GameplayTag) -> bool {
        let changed = self.tags.add_loose(tag);
        self.tags_dirty |= changed;
        changed
    }

    pub fn remove_loose_tag(&mut self, tag: &GameplayTag) -> bool {
        let changed = self.tags.remove_loose(tag);
        self.tags_dirty |= changed;
        changed
    }

    pub(crate) fn remove_loose_tags(&mut self, tags: &TagSet) -> bool {
        let mut changed = false;
        for tag in tags {
            changed |= self.remove_loose_tag(tag);
        }
        changed
    }

    pub(crate) fn grant_tags(&mut self, tags: &TagSet) {
        if tags.is_empty() {
            return;
        }
        self.tags_dirty |= self.tags.grant(tags);
    }

    pub(crate) fn revoke_tags(&mut self, tags: &TagSet) {
        if tags.is_empty() {
            return;
        }
        self.tags_dirty |= self.tags.revoke(tags);
    }

    pub(crate) fn take_tags_dirty(&mut self) -> bool {
        std::mem::take(&mut self.tags_dirty)
    }

    pub(crate) fn has_dirty_tags(&self) -> bool {
        self.tags_dirty
    }

    // ========================================================================
    // Attributes & effects
    // ========================================================================

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Mutable attribute access for setup code (base values, clamp hook).
    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    /// Frames left on the normal cooldown of `skill`, zero when ready.
    pub fn remaining_cooldown(&self, skill: SkillId) -> Frames {
        self.effects
            .with_purpose(EffectPurpose::Cooldown(skill))
            .and_then(|instance| instance.remaining())
            .unwrap_or(0)
    }

    // ========================================================================
    // Abilities
    // ========================================================================

    pub fn find_ability_by_id(&self, skill: SkillId) -> Option<&AbilitySpec> {
        self.abilities.get(&skill)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilitySpec> {
        self.abilities.values()
    }

    pub fn charges(&self, skill: SkillId) -> Option<&ChargeState> {
        self.charges.get(&skill)
    }

    pub fn is_ability_active(&self, skill: SkillId) -> bool {
        self.abilities.get(&skill).is_some_and(AbilitySpec::is_active)
    }

    /// The ability currently running `run`, if that run is still active.
    pub fn active_run(&self, run: RunId) -> Option<&AbilitySpec> {
        self.abilities
            .values()
            .find(|spec| spec.is_active() && spec.run_id() == Some(run))
    }

    pub(crate) fn active_run_mut(&mut self, run: RunId) -> Option<&mut AbilitySpec> {
        self.abilities
            .values_mut()
            .find(|spec| spec.is_active() && spec.run_id() == Some(run))
    }

    pub fn timeline(&self) -> &TimelineScheduler {
        &self.timeline
    }
}
