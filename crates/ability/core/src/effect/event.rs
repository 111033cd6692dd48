use std::sync::Arc;

use super::{EffectOrigin, EffectPurpose};
use crate::ids::{EffectHandle, UnitId};

/// Why an effect instance left its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RemovalReason {
    /// Duration ran out.
    Expired,
    /// Explicit cancellation by game code or a tag query.
    Cancelled,
    /// The last stack was removed.
    StackDepleted,
    /// The target gained a tag in `ongoing_blocked`.
    BlockedByTags,
    /// The applying ability run ended.
    AbilityEnded,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EffectEventKind {
    /// A new duration or infinite instance was created.
    Applied { handle: EffectHandle },
    /// An instant effect mutated base values.
    Executed,
    /// An existing instance gained a stack.
    Stacked { handle: EffectHandle, stack_count: u32 },
    /// The application was dropped because the stack was already full.
    StackOverflow { handle: EffectHandle },
    /// Tag gate rejected the application. Nothing changed.
    Blocked,
    PeriodicTick { handle: EffectHandle, tick: u32 },
    Removed { handle: EffectHandle, reason: RemovalReason },
}

/// Lifecycle notification produced by the effect engine.
///
/// The runtime journals these and routes them back into the graph through
/// `origin`.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectEvent {
    pub target: UnitId,
    pub source: UnitId,
    pub effect: String,
    pub kind: EffectEventKind,
    pub origin: Option<Arc<EffectOrigin>>,
    pub purpose: EffectPurpose,
}
