//! Targeting, cue and animation collaborators.

use crate::graph::{CueKind, TargetShape};
use crate::ids::{AnimationHandle, CueHandle, UnitId};
use crate::tag::TagSet;

/// Spatial search. Must return immediately.
pub trait TargetingOracle: Send + Sync {
    /// Units inside `shape` around `origin` whose tags match `tag_filter`.
    /// An empty filter matches every unit.
    fn find_targets(&self, origin: UnitId, shape: &TargetShape, tag_filter: &TagSet) -> Vec<UnitId>;
}

/// Parameters of one cue invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct CueRequest {
    pub kind: CueKind,
    pub asset: String,
    pub attach_to: UnitId,
    pub instigator: UnitId,
    /// Resolved floating-text value.
    pub value: Option<f32>,
}

/// Presentation sink. Fire-and-forget: the runtime never waits on it.
pub trait CueOracle: Send + Sync {
    fn play_cue(&self, handle: CueHandle, request: &CueRequest);

    /// Stops a duration-bound cue started earlier.
    fn stop_cue(&self, handle: CueHandle);
}

/// Animation playback driver.
pub trait AnimationOracle: Send + Sync {
    fn play_animation(&self, unit: UnitId, animation: &str, looping: bool) -> AnimationHandle;

    fn stop_animation(&self, _handle: AnimationHandle) {}
}
