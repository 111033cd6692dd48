//! Graph interpreter.
//!
//! A [`SpecExecutor`] walks an ability graph depth-first, one pulse at a
//! time. Every visited node gets a transient [`NodeSpec`] with a fresh
//! [`SpecId`], runs its kind's routine synchronously, and continues along
//! the output port matching its outcome. Effects and timeline tasks keep
//! their originating node and context so later pulses (periodic ticks,
//! animation frames) re-enter the graph from the same place.
//!
//! Pulses come in two flavours:
//!
//! - **bound**: activation and timeline pulses. Every node first checks that
//!   its run is still active, so nothing executes after the ability ended.
//! - **unbound**: pulses routed from effect events. They outlive the run,
//!   except for run-scoped tasks and effects flagged `CANCEL_ON_ABILITY_END`.
//!
//! Structure:
//! - `mod.rs`: traversal, event routing, run lifecycle, tag settling
//! - `nodes.rs`: one routine per node kind

mod nodes;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::asc::{AbilityRun, AbilityState};
use crate::attribute::ModifierOp;
use crate::context::ExecutionContext;
use crate::cooldown::{ChargeState, CooldownSpec, normal_cooldown};
use crate::effect::{
    ApplyOutcome, EffectApplication, EffectEvent, EffectEventKind, RemovalReason, engine,
};
use crate::env::{AbilityEnv, compute_seed};
use crate::graph::{AbilityGraph, AbilityNodeData, EffectTarget, NodeData, NodeKind, ports};
use crate::ids::{CueHandle, NodeGuid, RunId, SkillId, SpecId, UnitId};
use crate::runtime::{AbilityRuntime, ActivationPlan, ActivationRequest, RuntimeEvent};
use crate::tag::TagSet;
use crate::timeline::TimelineAction;

/// Transient runtime instance of one node execution.
#[derive(Clone, Copy, Debug)]
pub(crate) struct NodeSpec<'a> {
    pub id: SpecId,
    pub skill: SkillId,
    pub node: &'a NodeData,
    pub context: &'a ExecutionContext,
}

impl NodeSpec<'_> {
    pub fn guid(&self) -> &NodeGuid {
        &self.node.guid
    }
}

pub(crate) struct SpecExecutor<'r, 'e> {
    runtime: &'r mut AbilityRuntime,
    env: AbilityEnv<'e>,
    depth: usize,
    /// Cues played while a timeline cue window is opening, innermost last.
    captures: Vec<Vec<CueHandle>>,
    bound: bool,
}

impl<'r, 'e> SpecExecutor<'r, 'e> {
    pub(crate) fn new(runtime: &'r mut AbilityRuntime, env: AbilityEnv<'e>) -> Self {
        Self {
            runtime,
            env,
            depth: 0,
            captures: Vec::new(),
            bound: false,
        }
    }

    fn with_binding<R>(&mut self, bound: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.bound, bound);
        let result = f(self);
        self.bound = previous;
        result
    }

    fn run_is_active(&self, caster: UnitId, run: RunId) -> bool {
        self.runtime
            .units
            .get(&caster)
            .is_some_and(|asc| asc.active_run(run).is_some())
    }

    fn active_run_mut(&mut self, caster: UnitId, run: RunId) -> Option<&mut AbilityRun> {
        self.runtime
            .units
            .get_mut(&caster)?
            .active_run_mut(run)?
            .run
            .as_mut()
    }

    fn resolve_target(target: EffectTarget, context: &ExecutionContext) -> UnitId {
        match target {
            EffectTarget::Caster => context.caster,
            EffectTarget::MainTarget => context.target_or_caster(),
        }
    }

    fn graph(&self, skill: SkillId) -> Option<Arc<AbilityGraph>> {
        match self.env.graphs() {
            Ok(graphs) => {
                let graph = graphs.ability_graph(skill);
                if graph.is_none() {
                    error!(%skill, "ability graph missing during traversal");
                }
                graph
            }
            Err(error) => {
                error!(%skill, %error, "graph oracle unavailable during traversal");
                None
            }
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Executes every node connected to `(from, port)` in authored order.
    pub(crate) fn execute_connected_nodes(
        &mut self,
        skill: SkillId,
        from: &NodeGuid,
        port: &str,
        context: &ExecutionContext,
    ) {
        let Some(graph) = self.graph(skill) else {
            return;
        };
        let targets = graph.connected(from, port).to_vec();
        if targets.is_empty() {
            return;
        }
        if self.depth >= self.runtime.config.max_execution_depth {
            error!(
                %skill,
                node = %from,
                port,
                depth = self.depth,
                "execution depth exceeded, pulse dropped"
            );
            return;
        }

        self.depth += 1;
        for target in &targets {
            self.execute_node(&graph, target, context);
        }
        self.depth -= 1;
    }

    fn execute_node(
        &mut self,
        graph: &Arc<AbilityGraph>,
        guid: &NodeGuid,
        context: &ExecutionContext,
    ) {
        let skill = graph.skill();
        let Some(node) = graph.node(guid) else {
            warn!(%skill, node = %guid, "dangling connection skipped");
            return;
        };
        if self.bound && !self.run_is_active(context.caster, context.run) {
            debug!(%skill, node = %guid, run = %context.run, "run no longer active, node skipped");
            return;
        }

        let spec = NodeSpec {
            id: SpecId(self.runtime.spec_ids.next()),
            skill,
            node,
            context,
        };
        self.runtime.events.push(RuntimeEvent::NodeExecuted {
            unit: context.caster,
            skill,
            node: guid.clone(),
            kind: node.kind.label(),
            spec: spec.id,
        });
        debug!(
            unit = %context.caster,
            %skill,
            node = %guid,
            kind = node.kind.label(),
            spec = %spec.id,
            "executing node"
        );

        match &node.kind {
            NodeKind::Ability(_) => {
                self.execute_connected_nodes(skill, guid, ports::OUT, context)
            }
            NodeKind::Effect(data) => self.execute_effect(graph, spec, data),
            NodeKind::Task(data) => self.execute_task(spec, data),
            NodeKind::Condition(data) => self.execute_condition(spec, data),
            NodeKind::Cue(data) => self.execute_cue(spec, data),
        }
        self.settle();
    }

    // ========================================================================
    // Activation & run lifecycle
    // ========================================================================

    /// Commits a gated activation and runs the root pulse.
    pub(crate) fn activate(&mut self, plan: ActivationPlan, request: ActivationRequest) -> RunId {
        let ActivationPlan {
            graph,
            root,
            level,
            cost,
        } = plan;
        let (unit, skill) = (request.unit, request.skill);

        if self
            .runtime
            .units
            .get(&unit)
            .is_some_and(|asc| asc.is_ability_active(skill))
        {
            self.end_run(unit, skill, AbilityState::Cancelled);
        }
        self.cancel_abilities_with_tags(unit, skill, &root.tags.cancel_abilities_with_tags);

        let run = RunId(self.runtime.run_ids.next());
        let seed = request
            .seed
            .unwrap_or_else(|| compute_seed(self.runtime.seed(), run.0, unit.0, skill.0));
        let context = Arc::new(ExecutionContext {
            caster: unit,
            main_target: request.target,
            skill,
            run,
            level,
            values: request.values,
            set_by_caller: request.set_by_caller,
            targets: Vec::new(),
            seed,
        });

        if let Some(asc) = self.runtime.units.get_mut(&unit) {
            if let Some(spec) = asc.abilities.get_mut(&skill) {
                spec.state = AbilityState::Active;
                spec.run = Some(AbilityRun::new(run, context.clone(), root.tags.clone()));
                spec.activation_count += 1;
                spec.cooldown = root.cooldown.clone();
            }
            asc.grant_tags(&root.tags.activation_owned);
            if let Some((attribute, amount)) = cost {
                asc.attributes
                    .apply_instant(attribute, ModifierOp::Add, -amount);
            }
        }

        let mut events = Vec::new();
        self.commit_cooldown(unit, skill, &root, &mut events);
        self.runtime
            .events
            .push(RuntimeEvent::AbilityActivated { unit, skill, run });
        info!(%unit, %skill, %run, name = %root.name, "ability activated");
        self.dispatch_effect_events(events);

        self.with_binding(true, |this| {
            this.execute_node(&graph, graph.root_guid(), &context)
        });
        self.settle();
        run
    }

    fn commit_cooldown(
        &mut self,
        unit: UnitId,
        skill: SkillId,
        root: &AbilityNodeData,
        events: &mut Vec<EffectEvent>,
    ) {
        match &root.cooldown {
            Some(CooldownSpec::Normal { duration, tag }) => {
                let runtime = &mut *self.runtime;
                if runtime.config.frames_from_seconds(*duration) == 0 {
                    return;
                }
                let application = normal_cooldown(unit, skill, *duration, tag, &runtime.config);
                if let Some(asc) = runtime.units.get_mut(&unit) {
                    engine::apply(asc, application, &mut runtime.effect_ids, events);
                }
            }
            Some(CooldownSpec::Charge { max_charges, .. }) => {
                if let Some(asc) = self.runtime.units.get_mut(&unit) {
                    let state = asc
                        .charges
                        .entry(skill)
                        .or_insert_with(|| ChargeState::full(*max_charges));
                    state.max = *max_charges;
                    state.current = state.current.min(state.max);
                    state.consume();
                }
                self.runtime.start_charge_recovery(unit, skill, events);
            }
            None => {}
        }
    }

    fn cancel_abilities_with_tags(&mut self, unit: UnitId, skill: SkillId, query: &TagSet) {
        if query.is_empty() {
            return;
        }
        let Some(asc) = self.runtime.units.get(&unit) else {
            return;
        };
        let matching: Vec<_> = asc
            .abilities()
            .filter(|spec| spec.skill != skill && spec.is_active())
            .filter(|spec| {
                spec.run
                    .as_ref()
                    .is_some_and(|run| run.tags.asset.has_any(query))
            })
            .map(|spec| spec.skill)
            .collect();

        for other in matching {
            debug!(%unit, cancelled = %other, by = %skill, "cancel_abilities_with_tags");
            self.end_run(unit, other, AbilityState::Cancelled);
        }
    }

    pub(crate) fn cancel_ability(&mut self, unit: UnitId, skill: SkillId) -> bool {
        self.end_run(unit, skill, AbilityState::Cancelled)
    }

    pub(crate) fn end_ability(&mut self, unit: UnitId, skill: SkillId) -> bool {
        self.end_run(unit, skill, AbilityState::Ended)
    }

    /// Ends the active run of `skill`, unwinding everything it owns.
    fn end_run(&mut self, unit: UnitId, skill: SkillId, state: AbilityState) -> bool {
        let Some(asc) = self.runtime.units.get_mut(&unit) else {
            return false;
        };
        let Some(spec) = asc.abilities.get_mut(&skill) else {
            return false;
        };
        if !spec.is_active() {
            return false;
        }
        let Some(run) = spec.run.take() else {
            return false;
        };
        spec.state = state;
        asc.revoke_tags(&run.tags.activation_owned);
        let actions = asc.timeline.cancel_run(run.id);

        let mut events = Vec::new();
        for (target, tags) in &run.granted_tags {
            if let Some(asc) = self.runtime.units.get_mut(target) {
                asc.revoke_tags(tags);
            }
        }
        for (target, handle) in &run.dependent_effects {
            if let Some(asc) = self.runtime.units.get_mut(target) {
                engine::release_stack(asc, *handle, RemovalReason::AbilityEnded, &mut events);
            }
        }

        self.runtime.events.push(RuntimeEvent::AbilityEnded {
            unit,
            skill,
            run: run.id,
            state,
        });
        info!(%unit, %skill, run = %run.id, ?state, "ability ended");

        self.run_timeline_actions(unit, actions);
        self.dispatch_effect_events(events);
        true
    }

    // ========================================================================
    // Effects
    // ========================================================================

    fn apply_raw(
        &mut self,
        target: UnitId,
        application: EffectApplication,
    ) -> Option<(ApplyOutcome, Vec<EffectEvent>)> {
        let runtime = &mut *self.runtime;
        let asc = runtime.units.get_mut(&target)?;
        let mut events = Vec::new();
        let outcome = engine::apply(asc, application, &mut runtime.effect_ids, &mut events);
        Some((outcome, events))
    }

    pub(crate) fn apply_effect(
        &mut self,
        target: UnitId,
        application: EffectApplication,
    ) -> Option<ApplyOutcome> {
        let (outcome, events) = self.apply_raw(target, application)?;
        self.dispatch_effect_events(events);
        Some(outcome)
    }

    /// Journals effect events and routes those with a graph origin into
    /// their node's ports.
    pub(crate) fn dispatch_effect_events(&mut self, events: Vec<EffectEvent>) {
        if events.is_empty() {
            return;
        }
        for event in self.runtime.process_effect_events(events) {
            self.route_effect_event(&event);
        }
    }

    fn route_effect_event(&mut self, event: &EffectEvent) {
        let Some(origin) = &event.origin else {
            return;
        };
        let fired: &[&str] = match &event.kind {
            EffectEventKind::Applied { .. } | EffectEventKind::Stacked { .. } => {
                &[ports::ON_APPLY]
            }
            EffectEventKind::Executed => &[ports::ON_APPLY, ports::ON_COMPLETE],
            EffectEventKind::Blocked => &[ports::ON_BLOCKED],
            EffectEventKind::PeriodicTick { .. } => &[ports::ON_PERIODIC_TICK],
            EffectEventKind::Removed {
                reason: RemovalReason::Expired,
                ..
            } => &[ports::ON_COMPLETE],
            EffectEventKind::StackOverflow { .. } | EffectEventKind::Removed { .. } => &[],
        };
        for port in fired {
            self.with_binding(false, |this| {
                this.execute_connected_nodes(origin.skill, &origin.node, port, &origin.context)
            });
        }
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Re-evaluates ongoing-blocked queries on every unit whose tags changed,
    /// until nothing changes or the pass limit is reached.
    pub(crate) fn settle(&mut self) {
        let passes = self.runtime.config.max_tag_reevaluation_passes.max(1);
        for _ in 0..passes {
            let dirty: Vec<_> = self
                .runtime
                .units
                .iter_mut()
                .filter_map(|(unit, asc)| asc.take_tags_dirty().then_some(*unit))
                .collect();
            if dirty.is_empty() {
                return;
            }
            for unit in dirty {
                self.enforce_ongoing_blocked(unit);
            }
        }
        if self.runtime.units.values().any(|asc| asc.has_dirty_tags()) {
            warn!(passes, "tag re-evaluation did not settle");
        }
    }

    fn enforce_ongoing_blocked(&mut self, unit: UnitId) {
        let Some(asc) = self.runtime.units.get(&unit) else {
            return;
        };
        let owned = asc.owned_tags();
        let blocked: Vec<_> = asc
            .abilities()
            .filter(|spec| spec.is_active())
            .filter(|spec| {
                spec.run.as_ref().is_some_and(|run| {
                    let ongoing = &run.tags.ongoing_blocked;
                    !ongoing.is_empty() && owned.has_any(ongoing)
                })
            })
            .map(|spec| spec.skill)
            .collect();

        for skill in blocked {
            debug!(%unit, %skill, "ongoing blocked tag cancelled ability");
            self.end_run(unit, skill, AbilityState::Cancelled);
        }

        let Some(asc) = self.runtime.units.get_mut(&unit) else {
            return;
        };
        let mut events = Vec::new();
        engine::cancel_blocked(asc, &mut events);
        self.dispatch_effect_events(events);
    }

    // ========================================================================
    // Frame stepping
    // ========================================================================

    /// Advances one unit by one frame: effects first, then timeline tasks.
    pub(crate) fn step_unit(&mut self, unit: UnitId) {
        let Some(asc) = self.runtime.units.get_mut(&unit) else {
            return;
        };
        let mut events = Vec::new();
        engine::tick(asc, 1, &mut events);
        self.dispatch_effect_events(events);

        let Some(asc) = self.runtime.units.get_mut(&unit) else {
            return;
        };
        let actions = asc.timeline.step();
        self.run_timeline_actions(unit, actions);
        self.settle();
    }

    fn run_timeline_actions(&mut self, unit: UnitId, actions: Vec<TimelineAction>) {
        for action in actions {
            match action {
                TimelineAction::FirePort { pulse, port } => {
                    if !self.run_is_active(unit, pulse.run) {
                        continue;
                    }
                    self.with_binding(true, |this| {
                        this.execute_connected_nodes(
                            pulse.skill,
                            &pulse.node,
                            &port,
                            &pulse.context,
                        )
                    });
                }
                TimelineAction::OpenCueWindow { pulse, window, port } => {
                    if !self.run_is_active(unit, pulse.run) {
                        continue;
                    }
                    self.captures.push(Vec::new());
                    self.with_binding(true, |this| {
                        this.execute_connected_nodes(
                            pulse.skill,
                            &pulse.node,
                            &port,
                            &pulse.context,
                        )
                    });
                    let cues = self.captures.pop().unwrap_or_default();
                    let attached = match self.runtime.units.get_mut(&unit) {
                        Some(asc) => asc.timeline.attach_window_cues(pulse.task, window, cues),
                        None => Err(cues),
                    };
                    if let Err(orphaned) = attached {
                        self.stop_cues(orphaned);
                    }
                }
                TimelineAction::StopCues(cues) => self.stop_cues(cues),
                TimelineAction::StopAnimation(handle) => {
                    if let Some(animations) = self.env.animations() {
                        animations.stop_animation(handle);
                    }
                }
            }
        }
    }

    fn stop_cues(&mut self, cues: Vec<CueHandle>) {
        for cue in cues {
            if !self.runtime.active_cues.remove(&cue) {
                continue;
            }
            if let Some(oracle) = self.env.cues() {
                oracle.stop_cue(cue);
            }
            self.runtime.events.push(RuntimeEvent::CueStopped { cue });
        }
    }
}
