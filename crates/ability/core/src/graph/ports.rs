//! Well-known output port names.

/// Default continuation of Ability, Cue and tag task nodes.
pub const OUT: &str = "Out";

pub const TRUE: &str = "true";
pub const FALSE: &str = "false";

pub const ON_APPLY: &str = "OnApply";
pub const ON_PERIODIC_TICK: &str = "OnPeriodicTick";
pub const ON_COMPLETE: &str = "OnComplete";
/// Fired when an effect's tag gate rejects the application.
pub const ON_BLOCKED: &str = "OnBlocked";

/// Fired once per found target by a target search.
pub const ON_TARGET: &str = "OnTarget";
pub const ON_EMPTY: &str = "OnEmpty";

/// Fired when an animation task starts.
pub const ON_START: &str = "OnStart";
