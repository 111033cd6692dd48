//! Error types for ability activation.

use crate::attribute::AttributeKind;
use crate::env::OracleError;
use crate::error::{ErrorSeverity, RuntimeError};
use crate::ids::{Frames, SkillId, UnitId};
use crate::tag::TagSet;

/// A gate that rejected an activation.
///
/// Rejections are ordinary control flow: the caller falls back to idle
/// behaviour and the unit's state is unchanged.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum GateRejection {
    #[error("unit {0} is not registered")]
    UnknownUnit(UnitId),

    #[error("{skill} is not granted to {unit}")]
    NotGranted { unit: UnitId, skill: SkillId },

    #[error("{skill} is already active")]
    AlreadyActive { skill: SkillId },

    #[error("{skill} requires tags {missing:?}")]
    MissingRequiredTags { skill: SkillId, missing: TagSet },

    #[error("{skill} is blocked by owned tags")]
    BlockedByTags { skill: SkillId },

    #[error("{skill} is on cooldown for {remaining} more frames")]
    OnCooldown { skill: SkillId, remaining: Frames },

    #[error("{skill} has no charges left")]
    NoCharges { skill: SkillId },

    #[error("{skill} costs {required} {attribute}, only {available} available")]
    InsufficientCost {
        skill: SkillId,
        attribute: AttributeKind,
        required: f32,
        available: f32,
    },
}

impl RuntimeError for GateRejection {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnknownUnit(_) | Self::NotGranted { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Expected,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownUnit(_) => "GATE_UNKNOWN_UNIT",
            Self::NotGranted { .. } => "GATE_NOT_GRANTED",
            Self::AlreadyActive { .. } => "GATE_ALREADY_ACTIVE",
            Self::MissingRequiredTags { .. } => "GATE_MISSING_REQUIRED_TAGS",
            Self::BlockedByTags { .. } => "GATE_BLOCKED_BY_TAGS",
            Self::OnCooldown { .. } => "GATE_ON_COOLDOWN",
            Self::NoCharges { .. } => "GATE_NO_CHARGES",
            Self::InsufficientCost { .. } => "GATE_INSUFFICIENT_COST",
        }
    }
}

/// Errors surfaced by [`AbilityRuntime::activate_ability`](crate::AbilityRuntime::activate_ability).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ActivationError {
    #[error("activation rejected: {0}")]
    Gate(#[from] GateRejection),

    #[error("no ability graph for {0}")]
    MissingDefinition(SkillId),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl ActivationError {
    pub fn gate(&self) -> Option<&GateRejection> {
        match self {
            Self::Gate(rejection) => Some(rejection),
            _ => None,
        }
    }
}

impl RuntimeError for ActivationError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Gate(rejection) => rejection.severity(),
            Self::MissingDefinition(_) => ErrorSeverity::Validation,
            Self::Oracle(error) => error.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Gate(rejection) => rejection.error_code(),
            Self::MissingDefinition(_) => "ACTIVATION_MISSING_DEFINITION",
            Self::Oracle(error) => error.error_code(),
        }
    }
}
