use crate::asc::AbilityState;
use crate::effect::{EffectEvent, EffectEventKind, RemovalReason};
use crate::env::CueRequest;
use crate::ids::{CueHandle, EffectHandle, NodeGuid, RunId, SkillId, SpecId, UnitId};

/// Journal entry appended by the runtime.
///
/// Drivers drain the journal once per frame to drive presentation, replays
/// or assertions. The order of entries is the execution order.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeEvent {
    AbilityActivated {
        unit: UnitId,
        skill: SkillId,
        run: RunId,
    },
    AbilityEnded {
        unit: UnitId,
        skill: SkillId,
        run: RunId,
        state: AbilityState,
    },
    NodeExecuted {
        unit: UnitId,
        skill: SkillId,
        node: NodeGuid,
        kind: &'static str,
        spec: SpecId,
    },
    EffectApplied {
        target: UnitId,
        source: UnitId,
        effect: String,
        handle: EffectHandle,
    },
    EffectExecuted {
        target: UnitId,
        source: UnitId,
        effect: String,
    },
    EffectStacked {
        target: UnitId,
        effect: String,
        handle: EffectHandle,
        stack_count: u32,
    },
    EffectStackOverflow {
        target: UnitId,
        effect: String,
        handle: EffectHandle,
    },
    EffectBlocked {
        target: UnitId,
        source: UnitId,
        effect: String,
    },
    PeriodicTick {
        target: UnitId,
        effect: String,
        handle: EffectHandle,
        tick: u32,
    },
    EffectRemoved {
        target: UnitId,
        effect: String,
        handle: EffectHandle,
        reason: RemovalReason,
    },
    CuePlayed {
        cue: CueHandle,
        request: CueRequest,
    },
    CueStopped {
        cue: CueHandle,
    },
    ChargeRestored {
        unit: UnitId,
        skill: SkillId,
        current: u32,
    },
}

impl From<&EffectEvent> for RuntimeEvent {
    fn from(event: &EffectEvent) -> Self {
        let target = event.target;
        let effect = event.effect.clone();
        match event.kind {
            EffectEventKind::Applied { handle } => Self::EffectApplied {
                target,
                source: event.source,
                effect,
                handle,
            },
            EffectEventKind::Executed => Self::EffectExecuted {
                target,
                source: event.source,
                effect,
            },
            EffectEventKind::Stacked {
                handle,
                stack_count,
            } => Self::EffectStacked {
                target,
                effect,
                handle,
                stack_count,
            },
            EffectEventKind::StackOverflow { handle } => Self::EffectStackOverflow {
                target,
                effect,
                handle,
            },
            EffectEventKind::Blocked => Self::EffectBlocked {
                target,
                source: event.source,
                effect,
            },
            EffectEventKind::PeriodicTick { handle, tick } => Self::PeriodicTick {
                target,
                effect,
                handle,
                tick,
            },
            EffectEventKind::Removed { handle, reason } => Self::EffectRemoved {
                target,
                effect,
                handle,
                reason,
            },
        }
    }
}
