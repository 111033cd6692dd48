//! Per-pulse execution context.

use std::collections::BTreeMap;

use crate::ids::{RunId, SkillId, UnitId};
use crate::magnitude::MagnitudeContext;

/// Caster, target and per-run values carried through a graph traversal.
///
/// Cloned into every transient spec and retained by effects and timeline
/// tasks that later re-enter the graph.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionContext {
    pub caster: UnitId,
    pub main_target: Option<UnitId>,
    pub skill: SkillId,
    pub run: RunId,
    pub level: u32,
    /// Named values readable by formulas.
    pub values: BTreeMap<String, f32>,
    pub set_by_caller: BTreeMap<String, f32>,
    /// Result of the most recent target search in this pulse.
    pub targets: Vec<UnitId>,
    /// Root of every random roll made on behalf of this run.
    pub seed: u64,
}

impl ExecutionContext {
    pub fn new(caster: UnitId, skill: SkillId, run: RunId) -> Self {
        Self {
            caster,
            main_target: None,
            skill,
            run,
            level: 1,
            values: BTreeMap::new(),
            set_by_caller: BTreeMap::new(),
            targets: Vec::new(),
            seed: 0,
        }
    }

    pub fn with_main_target(mut self, target: Option<UnitId>) -> Self {
        self.main_target = target;
        self
    }

    /// Main target, or the caster when none was chosen.
    pub fn target_or_caster(&self) -> UnitId {
        self.main_target.unwrap_or(self.caster)
    }

    pub fn magnitude_context(&self) -> MagnitudeContext {
        MagnitudeContext {
            level: self.level,
            values: self.values.clone(),
            set_by_caller: self.set_by_caller.clone(),
        }
    }
}
