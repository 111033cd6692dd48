//! Ability runtime: the arena of units and the public driving API.
//!
//! The [`AbilityRuntime`] owns every [`AbilitySystemComponent`] keyed by
//! [`UnitId`], plus the shared services (formula cache, magnitude
//! calculations, id allocators, event journal). All mutation flows through
//! it; external collaborators are reached through the [`AbilityEnv`] passed
//! into each call.
//!
//! Within one [`tick`](AbilityRuntime::tick) frame, each unit processes
//! live magnitude refresh, effect expiry and periodic ticks, then timeline
//! tasks. A driver that ticks before evaluating activations therefore always
//! gates against up-to-date cooldown and tag state.

mod activation;
mod error;
mod event;

pub use activation::ActivationRequest;
pub(crate) use activation::ActivationPlan;
pub use error::{ActivationError, GateRejection};
pub use event::RuntimeEvent;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::asc::{AbilitySpec, AbilitySystemComponent};
use crate::config::RuntimeConfig;
use crate::context::ExecutionContext;
use crate::cooldown::{ChargeState, CooldownSpec, charge_recovery};
use crate::effect::{
    ApplyOutcome, DurationPolicy, EffectApplication, EffectDefinition, EffectEvent,
    EffectEventKind, EffectFlags, EffectOrigin, EffectPurpose, RemovalReason, ResolvedModifier,
    engine,
};
use crate::env::AbilityEnv;
use crate::error::RuntimeError;
use crate::executor::SpecExecutor;
use crate::formula::FormulaCache;
use crate::ids::{CueHandle, EffectHandle, Frames, IdAllocator, NodeGuid, RunId, SkillId, UnitId};
use crate::magnitude::{
    Magnitude, MagnitudeCalculation, MagnitudeCalculations, MagnitudeContext, MagnitudeInputs,
    MagnitudeResolver,
};
use crate::tag::{GameplayTag, TagSet};

/// Deterministic, frame-stepped ability runtime.
#[derive(Debug)]
pub struct AbilityRuntime {
    pub(crate) config: RuntimeConfig,
    seed: u64,
    pub(crate) units: BTreeMap<UnitId, AbilitySystemComponent>,
    pub(crate) formulas: FormulaCache,
    pub(crate) calculations: MagnitudeCalculations,
    pub(crate) effect_ids: IdAllocator,
    pub(crate) run_ids: IdAllocator,
    pub(crate) spec_ids: IdAllocator,
    pub(crate) cue_ids: IdAllocator,
    pub(crate) task_ids: IdAllocator,
    /// Cues that still owe a stop call.
    pub(crate) active_cues: BTreeSet<CueHandle>,
    pub(crate) events: Vec<RuntimeEvent>,
    frame: u64,
}

impl AbilityRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            seed: 0,
            units: BTreeMap::new(),
            formulas: FormulaCache::new(),
            calculations: MagnitudeCalculations::new(),
            effect_ids: IdAllocator::new(),
            run_ids: IdAllocator::new(),
            spec_ids: IdAllocator::new(),
            cue_ids: IdAllocator::new(),
            task_ids: IdAllocator::new(),
            active_cues: BTreeSet::new(),
            events: Vec::new(),
            frame: 0,
        }
    }

    /// Root seed mixed into every run seed that the request does not fix.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Registers a custom modifier magnitude calculation by name.
    pub fn register_calculation(
        &mut self,
        name: impl Into<String>,
        calculation: impl MagnitudeCalculation + 'static,
    ) {
        self.calculations.register(name, calculation);
    }

    // ========================================================================
    // Units
    // ========================================================================

    /// Adds a unit, replacing (and returning) any unit with the same id.
    pub fn add_unit(&mut self, asc: AbilitySystemComponent) -> Option<AbilitySystemComponent> {
        self.units.insert(asc.unit(), asc)
    }

    pub fn remove_unit(&mut self, unit: UnitId) -> Option<AbilitySystemComponent> {
        self.units.remove(&unit)
    }

    pub fn unit(&self, unit: UnitId) -> Option<&AbilitySystemComponent> {
        self.units.get(&unit)
    }

    pub fn unit_mut(&mut self, unit: UnitId) -> Option<&mut AbilitySystemComponent> {
        self.units.get_mut(&unit)
    }

    pub fn units(&self) -> impl Iterator<Item = &AbilitySystemComponent> {
        self.units.values()
    }

    // ========================================================================
    // Abilities
    // ========================================================================

    /// Grants `skill` to `unit`. Returns false when the unit is unknown or
    /// already has the ability.
    pub fn grant_ability(&mut self, unit: UnitId, skill: SkillId, level: u32) -> bool {
        let Some(asc) = self.units.get_mut(&unit) else {
            warn!(%unit, %skill, "grant to unknown unit ignored");
            return false;
        };
        if asc.abilities.contains_key(&skill) {
            return false;
        }
        asc.abilities
            .insert(skill, AbilitySpec::new(skill, unit, level));
        true
    }

    /// Removes a granted ability, cancelling its run first.
    pub fn remove_ability(&mut self, env: AbilityEnv<'_>, unit: UnitId, skill: SkillId) -> bool {
        self.cancel_ability(env, unit, skill);
        let Some(asc) = self.units.get_mut(&unit) else {
            return false;
        };
        asc.charges.remove(&skill);
        asc.abilities.remove(&skill).is_some()
    }

    pub fn find_ability_by_id(&self, unit: UnitId, skill: SkillId) -> Option<&AbilitySpec> {
        self.units.get(&unit)?.find_ability_by_id(skill)
    }

    /// Frames left on the normal cooldown of `skill`.
    pub fn remaining_cooldown(&self, unit: UnitId, skill: SkillId) -> Frames {
        self.units
            .get(&unit)
            .map_or(0, |asc| asc.remaining_cooldown(skill))
    }

    /// Charge counter of `skill`. Created on first activation.
    pub fn charges(&self, unit: UnitId, skill: SkillId) -> Option<ChargeState> {
        self.units.get(&unit)?.charges(skill).copied()
    }

    /// Activates an ability.
    ///
    /// # Errors
    ///
    /// Returns the first failing gate, a missing graph, or an oracle error.
    /// Nothing is mutated unless every gate passes.
    pub fn activate_ability(
        &mut self,
        env: AbilityEnv<'_>,
        request: ActivationRequest,
    ) -> Result<RunId, ActivationError> {
        let plan = match self.check_activation(env, &request) {
            Ok(plan) => plan,
            Err(error) => {
                if error.severity().is_expected() {
                    debug!(
                        unit = %request.unit,
                        skill = %request.skill,
                        code = error.error_code(),
                        "activation rejected"
                    );
                } else {
                    warn!(
                        unit = %request.unit,
                        skill = %request.skill,
                        code = error.error_code(),
                        %error,
                        "activation failed"
                    );
                }
                return Err(error);
            }
        };
        Ok(SpecExecutor::new(self, env).activate(plan, request))
    }

    /// Boolean form of [`activate_ability`](Self::activate_ability).
    pub fn try_activate_ability(
        &mut self,
        env: AbilityEnv<'_>,
        unit: UnitId,
        skill: SkillId,
        target: Option<UnitId>,
    ) -> bool {
        let mut request = ActivationRequest::new(unit, skill);
        request.target = target;
        self.activate_ability(env, request).is_ok()
    }

    /// Cancels the running ability. Returns false if it was not active.
    pub fn cancel_ability(&mut self, env: AbilityEnv<'_>, unit: UnitId, skill: SkillId) -> bool {
        let mut executor = SpecExecutor::new(self, env);
        let ended = executor.cancel_ability(unit, skill);
        executor.settle();
        ended
    }

    /// Ends the running ability normally.
    pub fn end_ability(&mut self, env: AbilityEnv<'_>, unit: UnitId, skill: SkillId) -> bool {
        let mut executor = SpecExecutor::new(self, env);
        let ended = executor.end_ability(unit, skill);
        executor.settle();
        ended
    }

    /// Fires `port` of node `from` in `skill`'s graph with `context`.
    ///
    /// The pulse is not bound to the context's run, so it executes even if
    /// that run already ended. Used by drivers that resume graphs from
    /// external events.
    pub fn execute_connected_nodes(
        &mut self,
        env: AbilityEnv<'_>,
        skill: SkillId,
        from: &NodeGuid,
        port: &str,
        context: &ExecutionContext,
    ) {
        let mut executor = SpecExecutor::new(self, env);
        executor.execute_connected_nodes(skill, from, port, context);
        executor.settle();
    }

    // ========================================================================
    // Effects & tags
    // ========================================================================

    /// Applies an effect outside of any ability graph.
    ///
    /// Returns `None` when the target is unknown.
    pub fn apply_effect_to_unit(
        &mut self,
        env: AbilityEnv<'_>,
        source: UnitId,
        target: UnitId,
        definition: Arc<EffectDefinition>,
        magnitudes: MagnitudeContext,
    ) -> Option<ApplyOutcome> {
        if !self.units.contains_key(&target) {
            warn!(%source, %target, effect = %definition.id, "effect target missing");
            return None;
        }
        let application = self.build_application(definition, source, target, magnitudes, None);
        let mut executor = SpecExecutor::new(self, env);
        let outcome = executor.apply_effect(target, application);
        executor.settle();
        outcome
    }

    /// Removes an effect instance by handle.
    pub fn remove_effect(
        &mut self,
        env: AbilityEnv<'_>,
        unit: UnitId,
        handle: EffectHandle,
    ) -> bool {
        let Some(asc) = self.units.get_mut(&unit) else {
            return false;
        };
        let mut events = Vec::new();
        let removed = engine::remove(asc, handle, RemovalReason::Cancelled, &mut events);
        let mut executor = SpecExecutor::new(self, env);
        executor.dispatch_effect_events(events);
        executor.settle();
        removed
    }

    /// Removes one stack of an effect instance.
    pub fn remove_effect_stack(
        &mut self,
        env: AbilityEnv<'_>,
        unit: UnitId,
        handle: EffectHandle,
    ) -> Option<u32> {
        let asc = self.units.get_mut(&unit)?;
        let mut events = Vec::new();
        let remaining = engine::remove_stack(asc, handle, &mut events);
        let mut executor = SpecExecutor::new(self, env);
        executor.dispatch_effect_events(events);
        executor.settle();
        remaining
    }

    /// Cancels every effect on `unit` whose asset or granted tags match.
    pub fn cancel_effects_with_tags(
        &mut self,
        env: AbilityEnv<'_>,
        unit: UnitId,
        query: &TagSet,
    ) -> usize {
        let Some(asc) = self.units.get_mut(&unit) else {
            return 0;
        };
        let mut events = Vec::new();
        let cancelled = engine::cancel_with_tags(asc, query, &mut events);
        let mut executor = SpecExecutor::new(self, env);
        executor.dispatch_effect_events(events);
        executor.settle();
        cancelled
    }

    /// Adds a loose tag and synchronously cancels whatever it blocks.
    pub fn add_loose_tag(&mut self, env: AbilityEnv<'_>, unit: UnitId, tag: GameplayTag) -> bool {
        let changed = self
            .units
            .get_mut(&unit)
            .is_some_and(|asc| asc.add_loose_tag(tag));
        SpecExecutor::new(self, env).settle();
        changed
    }

    pub fn remove_loose_tag(
        &mut self,
        env: AbilityEnv<'_>,
        unit: UnitId,
        tag: &GameplayTag,
    ) -> bool {
        let changed = self
            .units
            .get_mut(&unit)
            .is_some_and(|asc| asc.remove_loose_tag(tag));
        SpecExecutor::new(self, env).settle();
        changed
    }

    // ========================================================================
    // Frame stepping & journal
    // ========================================================================

    /// Advances the simulation by `frames`, one frame at a time.
    pub fn tick(&mut self, env: AbilityEnv<'_>, frames: Frames) {
        for _ in 0..frames {
            self.frame += 1;
            let units: Vec<_> = self.units.keys().copied().collect();
            for unit in units {
                self.refresh_live_magnitudes(unit);
                SpecExecutor::new(self, env).step_unit(unit);
            }
        }
    }

    /// Takes every journal entry recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[RuntimeEvent] {
        &self.events
    }

    // ========================================================================
    // Internal services
    // ========================================================================

    pub(crate) fn resolve_magnitude(
        &mut self,
        magnitude: &Magnitude,
        caster: UnitId,
        target: UnitId,
        context: &MagnitudeContext,
        stack_count: u32,
    ) -> f32 {
        let inputs = MagnitudeInputs::new(context)
            .with_caster(self.units.get(&caster).map(|asc| &asc.attributes))
            .with_target(self.units.get(&target).map(|asc| &asc.attributes))
            .with_stack_count(stack_count);
        MagnitudeResolver {
            formulas: &mut self.formulas,
            calculations: &self.calculations,
            fallback: self.config.formula_fallback,
        }
        .resolve(magnitude, &inputs)
    }

    fn resolve_frames(
        &mut self,
        seconds: &Magnitude,
        source: UnitId,
        target: UnitId,
        context: &MagnitudeContext,
    ) -> Frames {
        let seconds = self.resolve_magnitude(seconds, source, target, context, 1);
        self.config.frames_from_seconds(seconds)
    }

    /// Resolves every magnitude of `definition` against the current state.
    pub(crate) fn build_application(
        &mut self,
        definition: Arc<EffectDefinition>,
        source: UnitId,
        target: UnitId,
        magnitudes: MagnitudeContext,
        origin: Option<Arc<EffectOrigin>>,
    ) -> EffectApplication {
        let mut modifiers = Vec::with_capacity(definition.modifiers.len());
        for (slot, spec) in definition.modifiers.iter().enumerate() {
            let magnitude =
                self.resolve_magnitude(&spec.magnitude, source, target, &magnitudes, 1);
            modifiers.push(ResolvedModifier {
                slot: slot as u32,
                attribute: spec.attribute,
                op: spec.op,
                magnitude: magnitude * spec.coefficient,
            });
        }

        let duration = match &definition.duration {
            DurationPolicy::HasDuration(seconds) => {
                Some(self.resolve_frames(seconds, source, target, &magnitudes))
            }
            DurationPolicy::Instant | DurationPolicy::Infinite => None,
        };
        let period = match &definition.period {
            Some(seconds) if definition.flags.contains(EffectFlags::IS_PERIODIC) => {
                let seconds = self.resolve_magnitude(seconds, source, target, &magnitudes, 1);
                let frames = self.config.period_frames(seconds);
                if frames.is_none() {
                    warn!(
                        effect = %definition.id,
                        seconds,
                        "periodic effect has no usable period, holding modifiers instead"
                    );
                }
                frames
            }
            _ => None,
        };

        EffectApplication {
            definition,
            source,
            target,
            modifiers,
            duration,
            period,
            magnitudes,
            origin,
            purpose: EffectPurpose::Gameplay,
        }
    }

    /// Re-reads live (non-snapshot) captured magnitudes on `unit`'s effects.
    fn refresh_live_magnitudes(&mut self, unit: UnitId) {
        let Some(asc) = self.units.get(&unit) else {
            return;
        };
        let mut live = Vec::new();
        for instance in asc.effects.iter().filter(|i| i.modifiers_applied) {
            for modifier in &instance.modifiers {
                let Some(spec) = instance.definition.modifiers.get(modifier.slot as usize) else {
                    continue;
                };
                if spec.magnitude.is_live() {
                    live.push((
                        instance.handle,
                        instance.source,
                        modifier.slot,
                        spec.magnitude.clone(),
                        spec.coefficient,
                        instance.magnitudes.clone(),
                    ));
                }
            }
        }

        for (handle, source, slot, magnitude, coefficient, context) in live {
            let value = self.resolve_magnitude(&magnitude, source, unit, &context, 1) * coefficient;
            let Some(asc) = self.units.get_mut(&unit) else {
                return;
            };
            let changed = asc
                .effects
                .get_mut(handle)
                .and_then(|instance| instance.modifiers.iter_mut().find(|m| m.slot == slot))
                .is_some_and(|modifier| {
                    let changed = modifier.magnitude != value;
                    modifier.magnitude = value;
                    changed
                });
            if changed {
                engine::rescale_modifiers(asc, handle);
            }
        }
    }

    /// Journals effect events and runs cooldown bookkeeping.
    ///
    /// Returns the events that carry a graph origin, in order, for the
    /// executor to route into ports.
    pub(crate) fn process_effect_events(&mut self, events: Vec<EffectEvent>) -> Vec<EffectEvent> {
        let mut queue = VecDeque::from(events);
        let mut routed = Vec::new();

        while let Some(event) = queue.pop_front() {
            self.events.push(RuntimeEvent::from(&event));

            if let (EffectPurpose::ChargeRecovery(skill), EffectEventKind::Removed { reason, .. }) =
                (event.purpose, &event.kind)
            {
                let mut follow_up = Vec::new();
                if *reason == RemovalReason::Expired {
                    self.restore_charge(event.target, skill, &mut follow_up);
                } else {
                    self.restart_charge_recovery(event.target, skill, &mut follow_up);
                }
                queue.extend(follow_up);
            }

            if event.origin.is_some() {
                routed.push(event);
            }
        }
        routed
    }

    fn restore_charge(&mut self, unit: UnitId, skill: SkillId, events: &mut Vec<EffectEvent>) {
        let Some(state) = self
            .units
            .get_mut(&unit)
            .and_then(|asc| asc.charges.get_mut(&skill))
        else {
            return;
        };
        state.restore();
        let current = state.current;
        debug!(%unit, %skill, current, "charge restored");
        self.events.push(RuntimeEvent::ChargeRestored {
            unit,
            skill,
            current,
        });
        self.start_charge_recovery(unit, skill, events);
    }

    fn restart_charge_recovery(
        &mut self,
        unit: UnitId,
        skill: SkillId,
        events: &mut Vec<EffectEvent>,
    ) {
        if let Some(state) = self
            .units
            .get_mut(&unit)
            .and_then(|asc| asc.charges.get_mut(&skill))
        {
            state.recovering = None;
        }
        self.start_charge_recovery(unit, skill, events);
    }

    /// Starts the next recovery slot when charges are missing and none is
    /// recovering.
    pub(crate) fn start_charge_recovery(
        &mut self,
        unit: UnitId,
        skill: SkillId,
        events: &mut Vec<EffectEvent>,
    ) {
        let Some(asc) = self.units.get_mut(&unit) else {
            return;
        };
        let Some(CooldownSpec::Charge {
            charge_time, tag, ..
        }) = asc.abilities.get(&skill).and_then(|spec| spec.cooldown.clone())
        else {
            return;
        };
        let Some(state) = asc.charges.get_mut(&skill) else {
            return;
        };
        if !state.needs_recovery() {
            return;
        }
        if self.config.frames_from_seconds(charge_time) == 0 {
            state.current = state.max;
            return;
        }

        let application = charge_recovery(unit, skill, charge_time, tag.as_ref(), &self.config);
        let outcome = engine::apply(asc, application, &mut self.effect_ids, events);
        if let Some(state) = asc.charges.get_mut(&skill) {
            state.recovering = outcome.handle();
        }
    }
}

impl Default for AbilityRuntime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}
