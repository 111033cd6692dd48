//! Activation requests and the side-effect free gate check.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::error;

use super::{AbilityRuntime, ActivationError, GateRejection};
use crate::attribute::AttributeKind;
use crate::cooldown::CooldownSpec;
use crate::env::AbilityEnv;
use crate::graph::{AbilityGraph, AbilityNodeData};
use crate::ids::{SkillId, UnitId};
use crate::magnitude::MagnitudeContext;

/// Parameters of one activation attempt.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivationRequest {
    pub unit: UnitId,
    pub skill: SkillId,
    pub target: Option<UnitId>,
    /// Named values readable by formulas during this run.
    pub values: BTreeMap<String, f32>,
    pub set_by_caller: BTreeMap<String, f32>,
    /// Seed of every random roll in this run. Derived from the runtime seed
    /// and run id when absent.
    pub seed: Option<u64>,
}

impl ActivationRequest {
    pub fn new(unit: UnitId, skill: SkillId) -> Self {
        Self {
            unit,
            skill,
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: UnitId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f32) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with_set_by_caller(mut self, key: impl Into<String>, value: f32) -> Self {
        self.set_by_caller.insert(key.into(), value);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Everything the gate resolved that the activation itself needs.
#[derive(Debug)]
pub(crate) struct ActivationPlan {
    pub graph: Arc<AbilityGraph>,
    pub root: AbilityNodeData,
    pub level: u32,
    pub cost: Option<(AttributeKind, f32)>,
}

impl AbilityRuntime {
    /// Runs every activation gate without mutating unit state.
    ///
    /// Gate order: unit, grant, definition, already active, required tags,
    /// blocked tags, cooldown or charges, cost.
    pub(crate) fn check_activation(
        &mut self,
        env: AbilityEnv<'_>,
        request: &ActivationRequest,
    ) -> Result<ActivationPlan, ActivationError> {
        let (unit, skill) = (request.unit, request.skill);

        let asc = self
            .units
            .get(&unit)
            .ok_or(GateRejection::UnknownUnit(unit))?;
        let spec = asc
            .find_ability_by_id(skill)
            .ok_or(GateRejection::NotGranted { unit, skill })?;
        let level = spec.level;

        let graph = env.graphs()?.ability_graph(skill).ok_or_else(|| {
            error!(%unit, %skill, "ability graph missing, activation aborted");
            ActivationError::MissingDefinition(skill)
        })?;
        let root = graph
            .root()
            .cloned()
            .ok_or(ActivationError::MissingDefinition(skill))?;

        if spec.is_active() && !root.allow_replace {
            return Err(GateRejection::AlreadyActive { skill }.into());
        }

        let owned = asc.owned_tags();
        if !owned.has_all(&root.tags.activation_required) {
            return Err(GateRejection::MissingRequiredTags {
                skill,
                missing: owned.missing(&root.tags.activation_required),
            }
            .into());
        }
        if owned.has_any(&root.tags.activation_blocked) {
            return Err(GateRejection::BlockedByTags { skill }.into());
        }

        match &root.cooldown {
            Some(cooldown @ CooldownSpec::Normal { .. }) => {
                if owned.has_any(&cooldown.gate_tags()) {
                    return Err(GateRejection::OnCooldown {
                        skill,
                        remaining: asc.remaining_cooldown(skill),
                    }
                    .into());
                }
            }
            Some(CooldownSpec::Charge { max_charges, .. }) => {
                let has_charge = asc
                    .charges(skill)
                    .map_or(*max_charges > 0, |state| state.has_charge());
                if !has_charge {
                    return Err(GateRejection::NoCharges { skill }.into());
                }
            }
            None => {}
        }

        let cost = match &root.cost {
            Some(cost) => {
                let context = MagnitudeContext {
                    level,
                    values: request.values.clone(),
                    set_by_caller: request.set_by_caller.clone(),
                };
                let target = request.target.unwrap_or(unit);
                let required =
                    self.resolve_magnitude(&cost.amount, unit, target, &context, 1).max(0.0);
                let available = self
                    .units
                    .get(&unit)
                    .and_then(|asc| asc.attributes().get_current_value(cost.attribute))
                    .unwrap_or(0.0);
                if available < required {
                    return Err(GateRejection::InsufficientCost {
                        skill,
                        attribute: cost.attribute,
                        required,
                        available,
                    }
                    .into());
                }
                Some((cost.attribute, required))
            }
            None => None,
        };

        Ok(ActivationPlan {
            graph,
            root,
            level,
            cost,
        })
    }
}
