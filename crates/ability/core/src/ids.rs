//! Identifier newtypes.
//!
//! Cross references between units, abilities, effects and running tasks are
//! always expressed through these ids and resolved through the owning
//! [`AbilityRuntime`](crate::AbilityRuntime) arena, never through pointers.

use std::fmt;

/// Number of simulation frames. All durations in the runtime use this unit.
pub type Frames = u32;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $inner);

        impl $name {
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// A game unit owning exactly one ability system component.
    UnitId(u32),
    "#"
);

define_id!(
    /// Ability definition id, as used by skill tables.
    SkillId(u32),
    "skill:"
);

define_id!(
    /// Transient id of one node execution.
    SpecId(u64),
    "spec:"
);

define_id!(
    /// Handle of an applied effect instance. Unique for the runtime lifetime.
    EffectHandle(u64),
    "effect:"
);

define_id!(
    /// One activation of an ability. A re-activation gets a fresh run id.
    RunId(u64),
    "run:"
);

define_id!(
    /// Presentation cue started through the cue oracle.
    CueHandle(u64),
    "cue:"
);

define_id!(
    /// Running timeline task (animation, wait, cue lifetime).
    TaskId(u64),
    "task:"
);

define_id!(
    /// Playback handle returned by the animation oracle.
    AnimationHandle(u64),
    "anim:"
);

/// Authored node identifier, unique within one ability graph.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeGuid(pub String);

impl NodeGuid {
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeGuid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NodeGuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Monotonic allocator for the numeric id newtypes.
#[derive(Clone, Debug)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub(crate) const fn new() -> Self {
        Self { next: 1 }
    }

    pub(crate) fn next(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
