//! Execution routines, one per node kind.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{NodeSpec, SpecExecutor};
use crate::asc::AbilityState;
use crate::effect::{ApplyOutcome, EffectFlags, EffectOrigin};
use crate::env::{CueRequest, compute_seed};
use crate::graph::{
    AbilityGraph, ConditionNodeData, CueNodeData, EffectNodeData, SearchTargetsData,
    TaskNodeData, ports,
};
use crate::ids::{CueHandle, TaskId};
use crate::runtime::RuntimeEvent;
use crate::timeline::TaskPulse;

impl SpecExecutor<'_, '_> {
    // ========================================================================
    // Effect
    // ========================================================================

    pub(super) fn execute_effect(
        &mut self,
        graph: &AbilityGraph,
        spec: NodeSpec<'_>,
        data: &EffectNodeData,
    ) {
        let context = spec.context;
        let definition = graph
            .effect_definition(spec.guid())
            .cloned()
            .unwrap_or_else(|| Arc::new(data.build_definition(spec.skill, spec.guid())));

        let dependent = definition
            .flags
            .contains(EffectFlags::CANCEL_ON_ABILITY_END);
        if dependent && !self.run_is_active(context.caster, context.run) {
            debug!(
                skill = %spec.skill,
                node = %spec.guid(),
                "run already ended, ability-bound effect skipped"
            );
            return;
        }

        let target = Self::resolve_target(data.target, context);
        if !self.runtime.units.contains_key(&target) {
            warn!(skill = %spec.skill, node = %spec.guid(), %target, "effect target missing");
            return;
        }

        let origin = Arc::new(EffectOrigin {
            skill: spec.skill,
            node: spec.guid().clone(),
            context: context.clone(),
        });
        let application = self.runtime.build_application(
            definition,
            context.caster,
            target,
            context.magnitude_context(),
            Some(origin),
        );
        let Some((outcome, events)) = self.apply_raw(target, application) else {
            return;
        };

        // One entry per stack this run contributed.
        if let (true, ApplyOutcome::Applied(handle) | ApplyOutcome::Stacked { handle, .. }) =
            (dependent, outcome)
        {
            if let Some(run) = self.active_run_mut(context.caster, context.run) {
                run.dependent_effects.push((target, handle));
            }
        }
        self.dispatch_effect_events(events);
    }

    // ========================================================================
    // Task
    // ========================================================================

    fn task_pulse(&mut self, spec: NodeSpec<'_>) -> TaskPulse {
        TaskPulse {
            task: TaskId(self.runtime.task_ids.next()),
            run: spec.context.run,
            skill: spec.skill,
            node: spec.guid().clone(),
            context: Arc::new(spec.context.clone()),
        }
    }

    pub(super) fn execute_task(&mut self, spec: NodeSpec<'_>, data: &TaskNodeData) {
        let context = spec.context;
        let run_scoped = matches!(
            data,
            TaskNodeData::Animation(_) | TaskNodeData::Wait { .. } | TaskNodeData::ApplyTags { .. }
        );
        if run_scoped && !self.run_is_active(context.caster, context.run) {
            debug!(
                skill = %spec.skill,
                node = %spec.guid(),
                "run already ended, task skipped"
            );
            return;
        }

        match data {
            TaskNodeData::Animation(animation) => {
                let handle = self.env.animations().map(|oracle| {
                    oracle.play_animation(
                        context.caster,
                        &animation.animation,
                        animation.is_animation_looping,
                    )
                });
                let pulse = self.task_pulse(spec);
                let Some(asc) = self.runtime.units.get_mut(&context.caster) else {
                    return;
                };
                let actions = asc
                    .timeline
                    .start_animation(pulse, animation.clone(), handle);
                self.run_timeline_actions(context.caster, actions);
            }
            TaskNodeData::Wait { seconds } => {
                let frames = self.runtime.config.frames_from_seconds(*seconds);
                let pulse = self.task_pulse(spec);
                let Some(asc) = self.runtime.units.get_mut(&context.caster) else {
                    return;
                };
                let actions = asc.timeline.start_wait(pulse, frames);
                self.run_timeline_actions(context.caster, actions);
            }
            TaskNodeData::EndAbility => {
                self.end_run(context.caster, context.skill, AbilityState::Ended);
            }
            TaskNodeData::SearchTargets(search) => self.search_targets(spec, search),
            TaskNodeData::ApplyTags { tags, target } => {
                let unit = Self::resolve_target(*target, context);
                let Some(asc) = self.runtime.units.get_mut(&unit) else {
                    warn!(skill = %spec.skill, node = %spec.guid(), %unit, "tag target missing");
                    return;
                };
                asc.grant_tags(tags);
                if let Some(run) = self.active_run_mut(context.caster, context.run) {
                    run.granted_tags.push((unit, tags.clone()));
                }
                self.execute_connected_nodes(spec.skill, spec.guid(), ports::OUT, context);
            }
            TaskNodeData::RemoveTags { tags, target } => {
                let unit = Self::resolve_target(*target, context);
                if let Some(asc) = self.runtime.units.get_mut(&unit) {
                    asc.remove_loose_tags(tags);
                }
                self.execute_connected_nodes(spec.skill, spec.guid(), ports::OUT, context);
            }
        }
    }

    fn search_targets(&mut self, spec: NodeSpec<'_>, search: &SearchTargetsData) {
        let context = spec.context;
        let found = match self.env.targeting() {
            Ok(targeting) => {
                targeting.find_targets(context.caster, &search.shape, &search.tag_filter)
            }
            Err(error) => {
                warn!(skill = %spec.skill, node = %spec.guid(), %error, "target search skipped");
                Vec::new()
            }
        };

        let mut seen = BTreeSet::new();
        let mut targets: Vec<_> = found
            .into_iter()
            .filter(|unit| self.runtime.units.contains_key(unit) && seen.insert(*unit))
            .collect();
        if let Some(max) = search.max_targets {
            targets.truncate(max);
        }
        debug!(skill = %spec.skill, node = %spec.guid(), found = targets.len(), "target search");

        if targets.is_empty() {
            self.execute_connected_nodes(spec.skill, spec.guid(), ports::ON_EMPTY, context);
            return;
        }
        for target in &targets {
            let mut pulse = context.clone();
            pulse.main_target = Some(*target);
            pulse.targets = targets.clone();
            self.execute_connected_nodes(spec.skill, spec.guid(), ports::ON_TARGET, &pulse);
        }
    }

    // ========================================================================
    // Condition
    // ========================================================================

    pub(super) fn execute_condition(&mut self, spec: NodeSpec<'_>, data: &ConditionNodeData) {
        let context = spec.context;
        let passed = match data {
            ConditionNodeData::AttributeCompare {
                subject,
                attribute,
                comparison,
                value,
            } => {
                let unit = Self::resolve_target(*subject, context);
                let current = self
                    .runtime
                    .units
                    .get(&unit)
                    .and_then(|asc| asc.attributes().get_current_value(*attribute));
                match current {
                    Some(lhs) => {
                        let rhs = self.runtime.resolve_magnitude(
                            value,
                            context.caster,
                            unit,
                            &context.magnitude_context(),
                            1,
                        );
                        comparison.compare(lhs, rhs)
                    }
                    None => false,
                }
            }
            ConditionNodeData::HasTags {
                subject,
                tags,
                require_all,
            } => {
                let unit = Self::resolve_target(*subject, context);
                self.runtime.units.get(&unit).is_some_and(|asc| {
                    if *require_all {
                        asc.owned_tags().has_all(tags)
                    } else {
                        asc.owned_tags().has_any(tags)
                    }
                })
            }
            ConditionNodeData::Chance { probability } => {
                let seed = compute_seed(context.seed, spec.id.0, context.caster.0, 0);
                self.env.rng().chance(seed, *probability)
            }
        };

        let port = if passed { ports::TRUE } else { ports::FALSE };
        debug!(skill = %spec.skill, node = %spec.guid(), port, "condition evaluated");
        self.execute_connected_nodes(spec.skill, spec.guid(), port, context);
    }

    // ========================================================================
    // Cue
    // ========================================================================

    pub(super) fn execute_cue(&mut self, spec: NodeSpec<'_>, data: &CueNodeData) {
        let context = spec.context;
        let attach_to = Self::resolve_target(data.attach_to, context);
        let value = data.text.as_ref().map(|text| {
            self.runtime.resolve_magnitude(
                text,
                context.caster,
                attach_to,
                &context.magnitude_context(),
                1,
            )
        });

        let cue = CueHandle(self.runtime.cue_ids.next());
        let request = CueRequest {
            kind: data.kind,
            asset: data.asset.clone(),
            attach_to,
            instigator: context.caster,
            value,
        };
        if let Some(oracle) = self.env.cues() {
            oracle.play_cue(cue, &request);
        }
        self.runtime
            .events
            .push(RuntimeEvent::CuePlayed { cue, request });

        let captured = match self.captures.last_mut() {
            Some(window) => {
                window.push(cue);
                true
            }
            None => false,
        };
        let frames = data
            .duration
            .map_or(0, |seconds| self.runtime.config.frames_from_seconds(seconds));
        if frames > 0 {
            let task = TaskId(self.runtime.task_ids.next());
            if let Some(asc) = self.runtime.units.get_mut(&context.caster) {
                asc.timeline.start_cue_lifetime(task, cue, frames);
            }
        }
        if captured || frames > 0 {
            self.runtime.active_cues.insert(cue);
        }

        self.execute_connected_nodes(spec.skill, spec.guid(), ports::OUT, context);
    }
}
