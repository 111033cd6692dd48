//! Graph traversal: node kinds, branching, guards and determinism.

mod common;

use ability_core::graph::{
    AbilityNodeData, Comparison, ConditionNodeData, CueKind, CueNodeData, EffectNodeData,
    EffectNodeKind, EffectTarget, NodeKind, SearchTargetsData, TargetShape, TaskNodeData, ports,
};
use ability_core::{
    AbilityEnv, AbilityGraphAsset, AbilityRuntime, AbilityState, ActivationRequest, AttributeKind,
    DurationPolicy, EffectDefinition, EffectFlags, ExecutionContext, GameplayTag, Magnitude,
    ModifierOp, ModifierSpec, NodeGuid, RemovalReason, RunId, RuntimeConfig, RuntimeEvent,
    SkillId, StackType, TagSet, UnitId,
};
use common::*;

const SKILL: SkillId = SkillId(10);

fn cue(asset: &str) -> NodeKind {
    NodeKind::Cue(CueNodeData::new(CueKind::Sound, asset))
}

fn damage(amount: f32) -> NodeKind {
    NodeKind::Effect(EffectNodeData::new(
        EffectNodeKind::Damage {
            amount: Magnitude::fixed(amount),
        },
        EffectTarget::MainTarget,
    ))
}

fn root() -> AbilityGraphAsset {
    ability(AbilityNodeData::new(SKILL, "Test"))
}

// ============================================================================
// Traversal order & guards
// ============================================================================

#[test]
fn test_connected_nodes_run_depth_first_in_authored_order() {
    let asset = root()
        .node("a", cue("a"))
        .node("a1", cue("a1"))
        .node("b", cue("b"))
        .connect(ROOT, ports::OUT, "a")
        .connect(ROOT, ports::OUT, "b")
        .connect("a", ports::OUT, "a1");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues),
            ActivationRequest::new(CASTER, SKILL),
        )
        .expect("activate");

    assert_eq!(cues.played_assets(), vec!["a", "a1", "b"]);
    assert_eq!(
        executed_nodes(&runtime.drain_events(), SKILL),
        vec!["root", "a", "a1", "b"]
    );
}

#[test]
fn test_dangling_connection_is_skipped() {
    let asset = root()
        .node("after", cue("after"))
        .connect(ROOT, ports::OUT, "missing")
        .connect(ROOT, ports::OUT, "after");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues),
            ActivationRequest::new(CASTER, SKILL),
        )
        .expect("dangling edges do not fail activation");

    assert_eq!(cues.played_assets(), vec!["after"]);
}

#[test]
fn test_execution_depth_guard_stops_cycles() {
    let asset = root()
        .node("echo", cue("echo"))
        .connect(ROOT, ports::OUT, "echo")
        .connect("echo", ports::OUT, "echo");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default().with_max_execution_depth(8));
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues),
            ActivationRequest::new(CASTER, SKILL),
        )
        .expect("activate");

    assert_eq!(cues.played_count(), 8);
}

// ============================================================================
// Conditions
// ============================================================================

fn branching(condition: ConditionNodeData) -> AbilityGraphAsset {
    root()
        .node("check", NodeKind::Condition(condition))
        .node("yes", cue("yes"))
        .node("no", cue("no"))
        .connect(ROOT, ports::OUT, "check")
        .connect("check", ports::TRUE, "yes")
        .connect("check", ports::FALSE, "no")
}

fn branch_taken(
    condition: ConditionNodeData,
    setup: impl FnOnce(&mut AbilityRuntime),
) -> Vec<String> {
    let graphs = catalog([branching(condition)]);
    let cues = RecordingCues::default();
    let env = AbilityEnv::new(&graphs).with_cues(&cues);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);
    setup(&mut runtime);
    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
        .expect("activate");
    cues.played_assets()
}

#[test]
fn test_attribute_compare_branches() {
    let low_health = ConditionNodeData::AttributeCompare {
        subject: EffectTarget::MainTarget,
        attribute: AttributeKind::Health,
        comparison: Comparison::Less,
        value: Magnitude::formula("Target.MaxHealth * 0.5"),
    };

    assert_eq!(branch_taken(low_health.clone(), |_| {}), vec!["no"]);
    assert_eq!(
        branch_taken(low_health, |runtime| {
            runtime
                .unit_mut(ENEMY)
                .expect("enemy")
                .attributes_mut()
                .set_base_value(AttributeKind::Health, 40.0);
        }),
        vec!["yes"]
    );

    let missing_attribute = ConditionNodeData::AttributeCompare {
        subject: EffectTarget::Caster,
        attribute: AttributeKind::CritRate,
        comparison: Comparison::GreaterOrEqual,
        value: Magnitude::fixed(0.0),
    };
    assert_eq!(branch_taken(missing_attribute, |_| {}), vec!["no"]);
}

#[test]
fn test_has_tags_branches_on_any_or_all() {
    let any = ConditionNodeData::HasTags {
        subject: EffectTarget::MainTarget,
        tags: TagSet::from_iter(["State.Burning", "State.Frozen"]),
        require_all: false,
    };
    let all = ConditionNodeData::HasTags {
        subject: EffectTarget::MainTarget,
        tags: TagSet::from_iter(["State.Burning", "State.Frozen"]),
        require_all: true,
    };
    let burning = |runtime: &mut AbilityRuntime| {
        runtime
            .unit_mut(ENEMY)
            .expect("enemy")
            .add_loose_tag(GameplayTag::new("State.Burning.Intense"));
    };

    assert_eq!(branch_taken(any.clone(), burning), vec!["yes"]);
    assert_eq!(branch_taken(all, burning), vec!["no"]);
    assert_eq!(branch_taken(any, |_| {}), vec!["no"]);
}

#[test]
fn test_chance_extremes_are_certain() {
    let always = ConditionNodeData::Chance { probability: 1.0 };
    let never = ConditionNodeData::Chance { probability: 0.0 };
    assert_eq!(branch_taken(always, |_| {}), vec!["yes"]);
    assert_eq!(branch_taken(never, |_| {}), vec!["no"]);
}

// ============================================================================
// Tasks
// ============================================================================

#[test]
fn test_search_targets_fires_once_per_found_unit() {
    let search = SearchTargetsData {
        shape: TargetShape::Circle { radius: 5.0 },
        tag_filter: TagSet::new(),
        max_targets: Some(2),
    };
    let asset = root()
        .node("search", NodeKind::Task(TaskNodeData::SearchTargets(search)))
        .node("hit", damage(15.0))
        .node("whiff", cue("whiff"))
        .connect(ROOT, ports::OUT, "search")
        .connect("search", ports::ON_TARGET, "hit")
        .connect("search", ports::ON_EMPTY, "whiff");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    // Unknown and repeated units are dropped before the cap applies.
    let targeting = FixedTargeting::new([ENEMY, UnitId(42), ENEMY, BYSTANDER, CASTER]);
    let env = AbilityEnv::new(&graphs)
        .with_cues(&cues)
        .with_targeting(&targeting);
    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL))
        .expect("activate");

    assert_eq!(health(&runtime, ENEMY), 85.0);
    assert_eq!(health(&runtime, BYSTANDER), 85.0);
    assert_eq!(health(&runtime, CASTER), 100.0);
    assert!(cues.played_assets().is_empty());

    let nobody = FixedTargeting::default();
    runtime.end_ability(env, CASTER, SKILL);
    runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues).with_targeting(&nobody),
            ActivationRequest::new(CASTER, SKILL),
        )
        .expect("activate again");
    assert_eq!(cues.played_assets(), vec!["whiff"]);
}

#[test]
fn test_missing_targeting_oracle_takes_empty_branch() {
    let search = SearchTargetsData {
        shape: TargetShape::Sector {
            radius: 4.0,
            angle: 90.0,
        },
        tag_filter: TagSet::new(),
        max_targets: None,
    };
    let asset = root()
        .node("search", NodeKind::Task(TaskNodeData::SearchTargets(search)))
        .node("whiff", cue("whiff"))
        .connect(ROOT, ports::OUT, "search")
        .connect("search", ports::ON_EMPTY, "whiff");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues),
            ActivationRequest::new(CASTER, SKILL),
        )
        .expect("activate");
    assert_eq!(cues.played_assets(), vec!["whiff"]);
}

#[test]
fn test_end_ability_stops_the_pulse() {
    let mut ability_root = AbilityNodeData::new(SKILL, "Quick");
    ability_root.tags.activation_owned = TagSet::from_iter(["State.Casting"]);
    let asset = ability(ability_root)
        .node("end", NodeKind::Task(TaskNodeData::EndAbility))
        .node("late", cue("late"))
        .connect(ROOT, ports::OUT, "end")
        .connect(ROOT, ports::OUT, "late");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    let run = runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues),
            ActivationRequest::new(CASTER, SKILL),
        )
        .expect("activate");

    assert!(cues.played_assets().is_empty());
    let caster = runtime.unit(CASTER).expect("caster");
    assert!(!caster.is_ability_active(SKILL));
    assert!(caster.owned_tags().is_empty());
    assert!(runtime.drain_events().contains(&RuntimeEvent::AbilityEnded {
        unit: CASTER,
        skill: SKILL,
        run,
        state: AbilityState::Ended,
    }));
}

#[test]
fn test_apply_tags_last_for_the_run() {
    let asset = root()
        .node(
            "mark",
            NodeKind::Task(TaskNodeData::ApplyTags {
                tags: TagSet::from_iter(["State.Marked"]),
                target: EffectTarget::MainTarget,
            }),
        )
        .node(
            "cleanse",
            NodeKind::Task(TaskNodeData::RemoveTags {
                tags: TagSet::from_iter(["State.Wet"]),
                target: EffectTarget::MainTarget,
            }),
        )
        .connect(ROOT, ports::OUT, "mark")
        .connect("mark", ports::OUT, "cleanse");
    let graphs = catalog([asset]);
    let env = AbilityEnv::new(&graphs);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);
    runtime.add_loose_tag(env, ENEMY, GameplayTag::new("State.Wet.Soaked"));

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
        .expect("activate");
    let enemy = runtime.unit(ENEMY).expect("enemy");
    assert!(enemy.owned_tags().has_tag(&GameplayTag::new("State.Marked")));
    assert!(!enemy.owned_tags().has_tag(&GameplayTag::new("State.Wet")));

    runtime.cancel_ability(env, CASTER, SKILL);
    assert!(runtime.unit(ENEMY).expect("enemy").owned_tags().is_empty());
}

#[test]
fn test_ending_a_run_withdraws_only_its_own_stacks() {
    const WARCRY: SkillId = SkillId(11);
    let focus = EffectDefinition::new("Focus")
        .with_duration(DurationPolicy::Infinite)
        .with_flags(EffectFlags::CANCEL_ON_ABILITY_END)
        .with_stacking(StackType::AggregateByTarget, 5)
        .with_modifier(ModifierSpec::new(AttributeKind::Attack, ModifierOp::Add, 5.0));
    let buff = || {
        NodeKind::Effect(
            EffectNodeData::new(EffectNodeKind::Buff, EffectTarget::Caster)
                .with_effect(focus.clone()),
        )
    };
    let stance = root().node("focus", buff()).connect(ROOT, ports::OUT, "focus");
    let warcry = ability(AbilityNodeData::new(WARCRY, "Warcry"))
        .node("focus", buff())
        .connect(ROOT, ports::OUT, "focus");
    let graphs = catalog([stance, warcry]);
    let env = AbilityEnv::new(&graphs);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);
    runtime.grant_ability(CASTER, WARCRY, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL))
        .expect("stance");
    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, WARCRY))
        .expect("warcry");
    assert_eq!(attribute(&runtime, CASTER, AttributeKind::Attack), 30.0);

    runtime.end_ability(env, CASTER, WARCRY);
    assert_eq!(attribute(&runtime, CASTER, AttributeKind::Attack), 25.0);
    let caster = runtime.unit(CASTER).expect("caster");
    assert_eq!(caster.effects().stack_count("Focus"), 1);

    runtime.end_ability(env, CASTER, SKILL);
    assert_eq!(attribute(&runtime, CASTER, AttributeKind::Attack), 20.0);
    assert!(runtime.unit(CASTER).expect("caster").effects().is_empty());
    assert!(runtime.drain_events().iter().any(|event| matches!(
        event,
        RuntimeEvent::EffectRemoved {
            reason: RemovalReason::AbilityEnded,
            ..
        }
    )));
}

#[test]
fn test_floating_text_resolves_formula_value() {
    let mut text = CueNodeData::new(CueKind::FloatingText, "txt_damage");
    text.text = Some(Magnitude::formula("Level * 10"));
    text.attach_to = EffectTarget::MainTarget;
    let asset = root()
        .node("text", NodeKind::Cue(text))
        .connect(ROOT, ports::OUT, "text");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 3);

    runtime
        .activate_ability(
            AbilityEnv::new(&graphs).with_cues(&cues),
            ActivationRequest::new(CASTER, SKILL).with_target(ENEMY),
        )
        .expect("activate");

    let played = cues.played.lock().expect("cue log");
    let (_, request) = &played[0];
    assert_eq!(request.attach_to, ENEMY);
    assert_eq!(request.instigator, CASTER);
    assert_eq!(request.value, Some(30.0));
}

#[test]
fn test_external_port_firing_reenters_graph() {
    let asset = root()
        .node("hit", damage(5.0))
        .connect("hit", ports::OUT, "ignored")
        .connect(ROOT, "OnParry", "hit");
    let graphs = catalog([asset]);
    let env = AbilityEnv::new(&graphs);
    let mut runtime = arena(RuntimeConfig::default());

    let context = ExecutionContext::new(CASTER, SKILL, RunId(99)).with_main_target(Some(ENEMY));
    runtime.execute_connected_nodes(env, SKILL, &NodeGuid::from(ROOT), "OnParry", &context);
    assert_eq!(health(&runtime, ENEMY), 95.0);
}

// ============================================================================
// Determinism
// ============================================================================

fn scripted_session() -> Vec<RuntimeEvent> {
    let asset = root()
        .node("roll", NodeKind::Condition(ConditionNodeData::Chance { probability: 0.5 }))
        .node("crit", damage(40.0))
        .node("hit", damage(10.0))
        .node("wait", NodeKind::Task(TaskNodeData::Wait { seconds: 0.5 }))
        .node("end", NodeKind::Task(TaskNodeData::EndAbility))
        .connect(ROOT, ports::OUT, "roll")
        .connect("roll", ports::TRUE, "crit")
        .connect("roll", ports::FALSE, "hit")
        .connect(ROOT, ports::OUT, "wait")
        .connect("wait", ports::ON_COMPLETE, "end");
    let graphs = catalog([asset]);
    let env = AbilityEnv::new(&graphs);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    for _ in 0..6 {
        runtime
            .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
            .expect("previous run ended");
        runtime.tick(env, 15);
    }
    runtime.drain_events()
}

#[test]
fn test_identical_sessions_produce_identical_journals() {
    let first = scripted_session();
    let second = scripted_session();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_fixed_seed_replays_chance_rolls() {
    let asset = branching(ConditionNodeData::Chance { probability: 0.5 });
    let graphs = catalog([asset]);
    let outcomes: Vec<Vec<String>> = (0..2)
        .map(|_| {
            let cues = RecordingCues::default();
            let mut runtime = arena(RuntimeConfig::default());
            runtime.grant_ability(CASTER, SKILL, 1);
            for _ in 0..8 {
                runtime
                    .activate_ability(
                        AbilityEnv::new(&graphs).with_cues(&cues),
                        ActivationRequest::new(CASTER, SKILL).with_seed(1234),
                    )
                    .expect("activate");
                runtime.end_ability(AbilityEnv::new(&graphs), CASTER, SKILL);
            }
            cues.played_assets()
        })
        .collect();

    assert_eq!(outcomes[0], outcomes[1]);
}
