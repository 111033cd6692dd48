//! Effect engine: instant, duration and infinite effects.
//!
//! An [`EffectDefinition`] is an immutable template. Applying it to a unit
//! either mutates base attribute values once (instant) or creates an
//! [`EffectInstance`] owned by the target's [`ActiveEffects`]. Instances hold
//! their modifiers and granted tags exclusively and unwind both when they are
//! removed.
//!
//! Periodic instances do not hold attribute modifiers. Each period executes
//! their modifiers against base values, the way repeated damage works.

mod active;
mod definition;
pub mod engine;
mod event;
mod instance;

pub use active::ActiveEffects;
pub use definition::{
    DurationPolicy, EffectDefinition, EffectFlags, EffectTags, ModifierSpec, StackPolicy,
    StackType,
};
pub use engine::ApplyOutcome;
pub use event::{EffectEvent, EffectEventKind, RemovalReason};
pub use instance::{
    EffectApplication, EffectInstance, EffectOrigin, EffectPurpose, ResolvedModifier,
};
