//! Deterministic, frame-stepped gameplay ability runtime.
//!
//! `ability-core` executes data-driven ability graphs against per-unit
//! [`AbilitySystemComponent`]s: hierarchical gameplay tags, attributes with
//! layered modifiers, gameplay effects (instant, duration, infinite,
//! periodic, stacking), cooldowns and charges, and a frame-based timeline for
//! animation and wait tasks. All state mutation flows through
//! [`AbilityRuntime`]; external collaborators (graph lookup, target search,
//! presentation, randomness) are oracles bundled in an [`AbilityEnv`].
//!
//! Given the same graphs, seed and sequence of calls, two runtimes produce the
//! same [`RuntimeEvent`] journal.
pub mod asc;
pub mod attribute;
pub mod config;
pub mod context;
pub mod cooldown;
pub mod effect;
pub mod env;
pub mod error;
pub mod formula;
pub mod graph;
pub mod ids;
pub mod magnitude;
pub mod runtime;
pub mod tag;
pub mod timeline;

mod executor;

pub use asc::{AbilityRun, AbilitySpec, AbilityState, AbilitySystemComponent};
pub use attribute::{AttributeKind, Attributes, ModifierOp};
pub use config::{RuntimeConfig, SkillConstants};
pub use context::ExecutionContext;
pub use cooldown::{ChargeState, CooldownSpec};
pub use effect::{
    ApplyOutcome, DurationPolicy, EffectDefinition, EffectFlags, ModifierSpec, RemovalReason,
    StackType,
};
pub use env::{
    AbilityEnv, AnimationOracle, CueOracle, CueRequest, GraphCatalog, GraphOracle, OracleError,
    RngOracle, TargetingOracle,
};
pub use error::{ErrorSeverity, RuntimeError};
pub use graph::{AbilityGraph, AbilityGraphAsset, Connection, GraphLoadError, NodeData, NodeKind};
pub use ids::{
    AnimationHandle, CueHandle, EffectHandle, Frames, NodeGuid, RunId, SkillId, SpecId, TaskId,
    UnitId,
};
pub use magnitude::{Magnitude, MagnitudeCalculation, MagnitudeContext};
pub use runtime::{AbilityRuntime, ActivationError, ActivationRequest, GateRejection, RuntimeEvent};
pub use tag::{GameplayTag, TagSet};
