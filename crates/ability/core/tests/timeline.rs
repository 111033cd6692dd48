//! Frame-driven tasks: animations, time effects, cue windows and waits.

mod common;

use ability_core::graph::{
    AbilityNodeData, AnimationTaskData, CueKind, CueNodeData, EffectNodeData, EffectNodeKind,
    EffectTarget, NodeKind, TaskNodeData, TimeCueData, ports,
};
use ability_core::{
    AbilityEnv, AbilityGraphAsset, AbilityState, ActivationRequest, AttributeKind, DurationPolicy,
    EffectDefinition, EffectFlags, GameplayTag, Magnitude, ModifierOp, ModifierSpec,
    RuntimeConfig, RuntimeEvent, SkillId, TagSet,
};
use common::*;

const SKILL: SkillId = SkillId(20);

fn animation(data: AnimationTaskData) -> NodeKind {
    NodeKind::Task(TaskNodeData::Animation(data))
}

fn particle(asset: &str) -> NodeKind {
    NodeKind::Cue(CueNodeData::new(CueKind::Particle, asset))
}

fn strike() -> NodeKind {
    NodeKind::Effect(EffectNodeData::new(
        EffectNodeKind::Damage {
            amount: Magnitude::fixed(25.0),
        },
        EffectTarget::MainTarget,
    ))
}

fn ended_states(events: &[RuntimeEvent]) -> Vec<AbilityState> {
    events
        .iter()
        .filter_map(|event| match event {
            RuntimeEvent::AbilityEnded { state, .. } => Some(*state),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Animation
// ============================================================================

/// 30-frame swing: glow cue during `[5, 15)`, hit at frame 10, end on
/// completion.
fn swing() -> AbilityGraphAsset {
    let data = AnimationTaskData::new("swing", 30)
        .with_time_effect("Hit", 10)
        .with_time_cue("Glow", 5, 15);
    ability(AbilityNodeData::new(SKILL, "Swing"))
        .node("anim", animation(data))
        .node("hit", strike())
        .node("glow", particle("fx_glow"))
        .node("end", NodeKind::Task(TaskNodeData::EndAbility))
        .connect(ROOT, ports::OUT, "anim")
        .connect("anim", "Hit", "hit")
        .connect("anim", "Glow", "glow")
        .connect("anim", ports::ON_COMPLETE, "end")
}

#[test]
fn test_animation_fires_time_effects_and_windows_on_their_frames() {
    let graphs = catalog([swing()]);
    let cues = RecordingCues::default();
    let animations = RecordingAnimations::default();
    let env = AbilityEnv::new(&graphs)
        .with_cues(&cues)
        .with_animations(&animations);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
        .expect("activate");
    assert_eq!(
        *animations.played.lock().expect("log"),
        vec![(CASTER, "swing".to_owned(), false)]
    );

    runtime.tick(env, 4);
    assert_eq!(cues.played_count(), 0);
    runtime.tick(env, 1);
    assert_eq!(cues.played_assets(), vec!["fx_glow"]);

    runtime.tick(env, 4);
    assert_eq!(health(&runtime, ENEMY), 100.0);
    runtime.tick(env, 1);
    assert_eq!(health(&runtime, ENEMY), 75.0);

    runtime.tick(env, 4);
    assert_eq!(cues.stopped_count(), 0);
    runtime.tick(env, 1);
    assert_eq!(cues.stopped_count(), 1);

    runtime.tick(env, 14);
    assert!(runtime.unit(CASTER).expect("caster").is_ability_active(SKILL));
    runtime.tick(env, 1);

    let caster = runtime.unit(CASTER).expect("caster");
    assert!(!caster.is_ability_active(SKILL));
    assert!(caster.timeline().is_empty());
    assert_eq!(animations.stopped.lock().expect("log").len(), 1);
    assert_eq!(ended_states(&runtime.drain_events()), vec![AbilityState::Ended]);
    assert_eq!(health(&runtime, ENEMY), 75.0);
}

#[test]
fn test_looping_animation_rearms_time_effects() {
    let data = AnimationTaskData::new("channel", 10)
        .looping()
        .with_time_effect("Pulse", 0);
    let asset = ability(AbilityNodeData::new(SKILL, "Channel"))
        .node("anim", animation(data))
        .node("hit", strike())
        .node("done", particle("fx_done"))
        .connect(ROOT, ports::OUT, "anim")
        .connect("anim", "Pulse", "hit")
        .connect("anim", ports::ON_COMPLETE, "done");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let env = AbilityEnv::new(&graphs).with_cues(&cues);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
        .expect("activate");
    assert_eq!(health(&runtime, ENEMY), 75.0);

    // Frames 10 and 20 restart the loop and fire the frame-0 pulse again.
    runtime.tick(env, 20);
    assert_eq!(health(&runtime, ENEMY), 25.0);
    assert!(cues.played_assets().is_empty());

    runtime.end_ability(env, CASTER, SKILL);
    runtime.tick(env, 10);
    assert_eq!(health(&runtime, ENEMY), 25.0);
    assert!(cues.played_assets().is_empty());
}

#[test]
fn test_zero_length_animation_completes_on_start() {
    let asset = ability(AbilityNodeData::new(SKILL, "Blink"))
        .node("anim", animation(AnimationTaskData::new("blink", 0)))
        .node("started", particle("fx_start"))
        .node("done", particle("fx_done"))
        .connect(ROOT, ports::OUT, "anim")
        .connect("anim", ports::ON_START, "started")
        .connect("anim", ports::ON_COMPLETE, "done");
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

    assert_eq!(cues.played_assets(), vec!["fx_start", "fx_done"]);
    assert!(runtime.unit(CASTER).expect("caster").timeline().is_empty());
}

// ============================================================================
// Wait
// ============================================================================

#[test]
fn test_wait_completes_after_converted_frames() {
    let asset = ability(AbilityNodeData::new(SKILL, "Delay"))
        .node("wait", NodeKind::Task(TaskNodeData::Wait { seconds: 1.0 }))
        .node("boom", strike())
        .connect(ROOT, ports::OUT, "wait")
        .connect("wait", ports::ON_COMPLETE, "boom");
    let graphs = catalog([asset]);
    let env = AbilityEnv::new(&graphs);
    let mut runtime = arena(RuntimeConfig::default().with_fps(60));
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
        .expect("activate");
    runtime.tick(env, 59);
    assert_eq!(health(&runtime, ENEMY), 100.0);
    runtime.tick(env, 1);
    assert_eq!(health(&runtime, ENEMY), 75.0);
}

#[test]
fn test_cancelled_wait_never_completes() {
    let asset = ability(AbilityNodeData::new(SKILL, "Delay"))
        .node("wait", NodeKind::Task(TaskNodeData::Wait { seconds: 0.5 }))
        .node("boom", strike())
        .connect(ROOT, ports::OUT, "wait")
        .connect("wait", ports::ON_COMPLETE, "boom");
    let graphs = catalog([asset]);
    let env = AbilityEnv::new(&graphs);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL).with_target(ENEMY))
        .expect("activate");
    assert!(runtime.cancel_ability(env, CASTER, SKILL));
    runtime.tick(env, 30);

    assert_eq!(health(&runtime, ENEMY), 100.0);
    assert_eq!(
        ended_states(&runtime.drain_events()),
        vec![AbilityState::Cancelled]
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_ongoing_blocked_tag_unwinds_running_ability() {
    let mut root = AbilityNodeData::new(SKILL, "Channel");
    root.tags.ongoing_blocked = TagSet::from_iter(["State.Stunned"]);
    root.tags.activation_blocked = TagSet::from_iter(["State.Stunned"]);
    root.tags.activation_owned = TagSet::from_iter(["State.Channeling"]);

    let aura = EffectDefinition::new("channel_aura")
        .with_duration(DurationPolicy::Infinite)
        .with_flags(EffectFlags::CANCEL_ON_ABILITY_END)
        .with_modifier(ModifierSpec::new(AttributeKind::Defense, ModifierOp::Add, 10.0))
        .granting("Buff.Aura");
    let data = AnimationTaskData::new("channel", 60)
        .looping()
        .with_time_cue("Aura", 0, TimeCueData::UNTIL_TASK_END);
    let asset = ability(root)
        .node("anim", animation(data))
        .node(
            "aura",
            NodeKind::Effect(
                EffectNodeData::new(EffectNodeKind::Buff, EffectTarget::Caster).with_effect(aura),
            ),
        )
        .node("glow", particle("fx_aura"))
        .connect(ROOT, ports::OUT, "aura")
        .connect(ROOT, ports::OUT, "anim")
        .connect("anim", "Aura", "glow");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let animations = RecordingAnimations::default();
    let env = AbilityEnv::new(&graphs)
        .with_cues(&cues)
        .with_animations(&animations);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL))
        .expect("activate");
    runtime.tick(env, 5);
    assert_eq!(attribute(&runtime, CASTER, AttributeKind::Defense), 15.0);
    assert_eq!(cues.played_assets(), vec!["fx_aura"]);

    runtime.add_loose_tag(env, CASTER, GameplayTag::new("State.Stunned.Hard"));

    let caster = runtime.unit(CASTER).expect("caster");
    assert!(!caster.is_ability_active(SKILL));
    assert!(caster.effects().is_empty());
    assert!(caster.timeline().is_empty());
    assert!(!caster.owned_tags().has_tag(&GameplayTag::new("State.Channeling")));
    assert!(!caster.owned_tags().has_tag(&GameplayTag::new("Buff.Aura")));
    assert_eq!(attribute(&runtime, CASTER, AttributeKind::Defense), 5.0);
    assert_eq!(cues.stopped_count(), 1);
    assert_eq!(animations.stopped.lock().expect("log").len(), 1);
    assert_eq!(
        ended_states(&runtime.drain_events()),
        vec![AbilityState::Cancelled]
    );

    // Blocked for as long as the tag stays.
    let rejected = runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL))
        .expect_err("stunned");
    assert!(rejected.gate().is_some());
}

#[test]
fn test_timed_cue_stops_independently_of_run() {
    let mut flash = CueNodeData::new(CueKind::Particle, "fx_flash");
    flash.duration = Some(0.5);
    let asset = ability(AbilityNodeData::new(SKILL, "Flash"))
        .node("flash", NodeKind::Cue(flash))
        .node("end", NodeKind::Task(TaskNodeData::EndAbility))
        .connect(ROOT, ports::OUT, "flash")
        .connect(ROOT, ports::OUT, "end");
    let graphs = catalog([asset]);
    let cues = RecordingCues::default();
    let env = AbilityEnv::new(&graphs).with_cues(&cues);
    let mut runtime = arena(RuntimeConfig::default());
    runtime.grant_ability(CASTER, SKILL, 1);

    runtime
        .activate_ability(env, ActivationRequest::new(CASTER, SKILL))
        .expect("activate");
    assert!(!runtime.unit(CASTER).expect("caster").is_ability_active(SKILL));

    runtime.tick(env, 14);
    assert_eq!(cues.stopped_count(), 0);
    runtime.tick(env, 1);
    assert_eq!(cues.stopped_count(), 1);
    runtime.tick(env, 30);
    assert_eq!(cues.stopped_count(), 1);
}
