//! Effect lifecycle operations on a single target.
//!
//! ```text
//! Applying ─┬─ gate fails ──────────────► Blocked (no change)
//!           ├─ Instant ─────────────────► base mutated, discarded
//!           ├─ stack key matches ───────► Stacked | StackOverflow
//!           └─ otherwise ───────────────► Active ─┬─► Expired
//!                                                 └─► Cancelled / BlockedByTags /
//!                                                     StackDepleted / AbilityEnded
//! ```
//!
//! Every function here mutates only the target component and appends
//! [`EffectEvent`]s; routing them back into ability graphs is the runtime's
//! job.

use tracing::debug;

use super::{
    EffectApplication, EffectEvent, EffectEventKind, EffectFlags, EffectInstance, RemovalReason,
};
use crate::asc::AbilitySystemComponent;
use crate::attribute::AppliedModifier;
use crate::ids::{EffectHandle, Frames, IdAllocator};
use crate::tag::TagSet;

/// Result of [`apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Blocked,
    Executed,
    Applied(EffectHandle),
    Stacked { handle: EffectHandle, stack_count: u32 },
    StackOverflow(EffectHandle),
}

impl ApplyOutcome {
    /// False only when the tag gate rejected the application.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Blocked)
    }

    pub fn handle(&self) -> Option<EffectHandle> {
        match self {
            Self::Applied(handle)
            | Self::Stacked { handle, .. }
            | Self::StackOverflow(handle) => Some(*handle),
            Self::Blocked | Self::Executed => None,
        }
    }
}

fn event_for(application: &EffectApplication, kind: EffectEventKind) -> EffectEvent {
    EffectEvent {
        target: application.target,
        source: application.source,
        effect: application.definition.id.clone(),
        kind,
        origin: application.origin.clone(),
        purpose: application.purpose,
    }
}

fn instance_event(instance: &EffectInstance, kind: EffectEventKind) -> EffectEvent {
    EffectEvent {
        target: instance.target,
        source: instance.source,
        effect: instance.definition.id.clone(),
        kind,
        origin: instance.origin.clone(),
        purpose: instance.purpose,
    }
}

/// True if the target's owned tags admit the application.
pub fn can_apply(asc: &AbilitySystemComponent, application: &EffectApplication) -> bool {
    let tags = &application.definition.tags;
    let owned = asc.owned_tags();
    owned.has_all(&tags.activation_required)
        && !owned.has_any(&tags.activation_blocked)
        && !owned.has_any(&tags.ongoing_blocked)
}

/// Applies an effect to `asc`.
///
/// Nothing is mutated when the gate fails. Instant effects grant no tags and
/// leave no instance behind. A stack refresh does not fire the
/// execute-on-application tick again.
pub fn apply(
    asc: &mut AbilitySystemComponent,
    application: EffectApplication,
    handles: &mut IdAllocator,
    events: &mut Vec<EffectEvent>,
) -> ApplyOutcome {
    let definition = application.definition.clone();

    if !can_apply(asc, &application) {
        debug!(
            unit = %asc.unit(),
            effect = %definition.id,
            "effect gate rejected application"
        );
        events.push(event_for(&application, EffectEventKind::Blocked));
        return ApplyOutcome::Blocked;
    }

    if definition.duration.is_instant() {
        for modifier in &application.modifiers {
            if asc
                .attributes
                .apply_instant(modifier.attribute, modifier.op, modifier.magnitude)
                .is_none()
            {
                debug!(
                    unit = %asc.unit(),
                    attribute = %modifier.attribute,
                    "instant modifier targets missing attribute"
                );
            }
        }
        events.push(event_for(&application, EffectEventKind::Executed));
        return ApplyOutcome::Executed;
    }

    if let Some(handle) = asc.effects.find_stack(&definition, application.source) {
        return add_stack(asc, handle, &application, events);
    }

    let handle = EffectHandle(handles.next());
    let granted_tags = definition.tags.activation_owned.clone();
    asc.grant_tags(&granted_tags);

    let periodic = definition.is_periodic() && application.period.is_some_and(|p| p > 0);
    let modifiers_applied = !periodic;
    if modifiers_applied {
        for modifier in &application.modifiers {
            let applied =
                AppliedModifier::new(modifier.op, modifier.scaled(1), handle, modifier.slot);
            asc.attributes.apply_modifier(modifier.attribute, applied);
        }
    }

    let instance = EffectInstance {
        handle,
        definition: definition.clone(),
        source: application.source,
        target: application.target,
        duration: application.duration,
        elapsed: 0,
        period: application.period,
        next_tick_at: application.period.unwrap_or(0),
        ticks_fired: 0,
        stack_count: 1,
        granted_tags,
        modifiers: application.modifiers.clone(),
        modifiers_applied,
        magnitudes: application.magnitudes.clone(),
        origin: application.origin.clone(),
        purpose: application.purpose,
    };
    let fires_immediately = instance.is_periodic()
        && definition
            .flags
            .contains(EffectFlags::EXECUTE_ON_APPLICATION);
    asc.effects.insert(instance);
    events.push(event_for(&application, EffectEventKind::Applied { handle }));

    if fires_immediately {
        execute_period(asc, handle, events);
    }

    ApplyOutcome::Applied(handle)
}

fn add_stack(
    asc: &mut AbilitySystemComponent,
    handle: EffectHandle,
    application: &EffectApplication,
    events: &mut Vec<EffectEvent>,
) -> ApplyOutcome {
    let Some(instance) = asc.effects.get_mut(handle) else {
        return ApplyOutcome::Blocked;
    };

    let policy = &instance.definition.stacking;
    if instance.stack_count >= policy.limit {
        events.push(event_for(application, EffectEventKind::StackOverflow { handle }));
        return ApplyOutcome::StackOverflow(handle);
    }

    instance.stack_count += 1;
    if policy.refresh_duration_on_stack {
        instance.refresh_duration();
    }
    let stack_count = instance.stack_count;
    rescale_modifiers(asc, handle);

    events.push(event_for(
        application,
        EffectEventKind::Stacked {
            handle,
            stack_count,
        },
    ));
    ApplyOutcome::Stacked {
        handle,
        stack_count,
    }
}

/// Pushes the instance's current stack scaling into its attribute modifiers.
pub(crate) fn rescale_modifiers(asc: &mut AbilitySystemComponent, handle: EffectHandle) {
    let Some(instance) = asc.effects.get(handle) else {
        return;
    };
    if !instance.modifiers_applied {
        return;
    }
    let updates: Vec<_> = instance
        .modifiers
        .iter()
        .map(|m| (m.attribute, m.slot, m.scaled(instance.stack_count)))
        .collect();
    for (attribute, slot, magnitude) in updates {
        asc.attributes
            .update_modifier(attribute, handle, slot, magnitude);
    }
}

/// Runs one periodic execution: modifiers hit base values, then a tick event
/// is emitted.
fn execute_period(
    asc: &mut AbilitySystemComponent,
    handle: EffectHandle,
    events: &mut Vec<EffectEvent>,
) {
    let Some(instance) = asc.effects.get_mut(handle) else {
        return;
    };
    instance.ticks_fired += 1;
    let tick = instance.ticks_fired;
    let stacks = instance.stack_count;
    let modifiers = instance.modifiers.clone();
    let event = instance_event(instance, EffectEventKind::PeriodicTick { handle, tick });

    for modifier in &modifiers {
        asc.attributes
            .apply_instant(modifier.attribute, modifier.op, modifier.scaled(stacks));
    }
    events.push(event);
}

/// Advances every instance by `frames`.
///
/// Elapsed time is capped at the total duration. Periodic boundaries crossed
/// in this step fire in order before expiry, so a 3 s effect with a 1 s
/// period fires at 1 s, 2 s and 3 s and then expires.
pub fn tick(asc: &mut AbilitySystemComponent, frames: Frames, events: &mut Vec<EffectEvent>) {
    for handle in asc.effects.handles() {
        let Some(instance) = asc.effects.get_mut(handle) else {
            continue;
        };

        let mut elapsed = instance.elapsed.saturating_add(frames);
        if let Some(total) = instance.duration {
            elapsed = elapsed.min(total);
        }
        instance.elapsed = elapsed;

        let mut due = 0u32;
        if instance.is_periodic() {
            if let Some(period) = instance.period {
                while instance.next_tick_at <= instance.elapsed {
                    due += 1;
                    match instance.next_tick_at.checked_add(period) {
                        Some(next) => instance.next_tick_at = next,
                        None => {
                            // Frame counter exhausted; no boundary is left.
                            instance.period = None;
                            break;
                        }
                    }
                }
            }
        }
        let expired = instance
            .duration
            .is_some_and(|total| instance.elapsed >= total);

        for _ in 0..due {
            execute_period(asc, handle, events);
        }
        if expired {
            remove(asc, handle, RemovalReason::Expired, events);
        }
    }
}

/// Removes an instance, unwinding its modifiers and granted tags.
pub fn remove(
    asc: &mut AbilitySystemComponent,
    handle: EffectHandle,
    reason: RemovalReason,
    events: &mut Vec<EffectEvent>,
) -> bool {
    let Some(instance) = asc.effects.remove(handle) else {
        return false;
    };
    asc.revoke_tags(&instance.granted_tags);
    if instance.modifiers_applied {
        asc.attributes.remove_modifiers_from(handle);
    }
    debug!(
        unit = %asc.unit(),
        effect = %instance.definition.id,
        %handle,
        ?reason,
        "effect removed"
    );
    events.push(instance_event(
        &instance,
        EffectEventKind::Removed { handle, reason },
    ));
    true
}

/// Removes one stack. The instance is destroyed when none remain.
///
/// Returns the remaining stack count, or `None` for an unknown handle.
pub fn remove_stack(
    asc: &mut AbilitySystemComponent,
    handle: EffectHandle,
    events: &mut Vec<EffectEvent>,
) -> Option<u32> {
    release_stack(asc, handle, RemovalReason::StackDepleted, events)
}

/// Like [`remove_stack`], but the last stack is removed with `reason`.
pub fn release_stack(
    asc: &mut AbilitySystemComponent,
    handle: EffectHandle,
    reason: RemovalReason,
    events: &mut Vec<EffectEvent>,
) -> Option<u32> {
    let instance = asc.effects.get_mut(handle)?;
    instance.stack_count = instance.stack_count.saturating_sub(1);
    let remaining = instance.stack_count;
    if remaining == 0 {
        remove(asc, handle, reason, events);
    } else {
        rescale_modifiers(asc, handle);
    }
    Some(remaining)
}

/// Cancels every instance whose `ongoing_blocked` tags the target now owns.
pub fn cancel_blocked(asc: &mut AbilitySystemComponent, events: &mut Vec<EffectEvent>) -> usize {
    let blocked: Vec<_> = asc
        .effects
        .iter()
        .filter(|instance| {
            let ongoing = &instance.definition.tags.ongoing_blocked;
            !ongoing.is_empty() && asc.owned_tags().has_any(ongoing)
        })
        .map(|instance| instance.handle)
        .collect();

    blocked
        .into_iter()
        .filter(|handle| remove(asc, *handle, RemovalReason::BlockedByTags, events))
        .count()
}

/// Cancels every instance whose asset or granted tags match `query`.
pub fn cancel_with_tags(
    asc: &mut AbilitySystemComponent,
    query: &TagSet,
    events: &mut Vec<EffectEvent>,
) -> usize {
    if query.is_empty() {
        return 0;
    }
    let matching: Vec<_> = asc
        .effects
        .iter()
        .filter(|instance| {
            instance.definition.tags.asset.has_any(query) || instance.granted_tags.has_any(query)
        })
        .map(|instance| instance.handle)
        .collect();

    matching
        .into_iter()
        .filter(|handle| remove(asc, *handle, RemovalReason::Cancelled, events))
        .count()
}
