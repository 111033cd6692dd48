//! Normal and charge cooldowns, built on top of the effect engine.
//!
//! - **Normal**: activation applies a duration effect that grants the
//!   cooldown tag. The gate rejects activation while the owner has that tag.
//! - **Charge**: a `(current, max)` counter. Activation consumes a charge.
//!   One recovery effect runs at a time; its expiry restores a charge and, if
//!   still below max, starts the next recovery.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::effect::{DurationPolicy, EffectApplication, EffectDefinition, EffectPurpose};
use crate::ids::{EffectHandle, SkillId, UnitId};
use crate::magnitude::MagnitudeContext;
use crate::tag::{GameplayTag, TagSet};

/// Cooldown authored on an Ability node. Times are in seconds.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CooldownSpec {
    Normal {
        duration: f32,
        tag: GameplayTag,
    },
    Charge {
        max_charges: u32,
        charge_time: f32,
        /// Granted while a charge is recovering.
        #[cfg_attr(feature = "serde", serde(default))]
        tag: Option<GameplayTag>,
    },
}

impl CooldownSpec {
    pub fn normal(duration: f32, tag: impl Into<GameplayTag>) -> Self {
        Self::Normal {
            duration,
            tag: tag.into(),
        }
    }

    pub fn charges(max_charges: u32, charge_time: f32) -> Self {
        Self::Charge {
            max_charges,
            charge_time,
            tag: None,
        }
    }

    /// Tag queried by the activation gate, if any.
    pub fn gate_tags(&self) -> TagSet {
        match self {
            Self::Normal { tag, .. } => TagSet::from_iter([tag.clone()]),
            Self::Charge { .. } => TagSet::new(),
        }
    }
}

/// Charge counter of one granted ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChargeState {
    pub current: u32,
    pub max: u32,
    pub recovering: Option<EffectHandle>,
}

impl ChargeState {
    pub fn full(max: u32) -> Self {
        Self {
            current: max,
            max,
            recovering: None,
        }
    }

    pub fn has_charge(&self) -> bool {
        self.current > 0
    }

    /// Consumes one charge. Returns false when empty.
    pub fn consume(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Restores one charge. Returns true if another recovery is needed.
    pub fn restore(&mut self) -> bool {
        self.current = (self.current + 1).min(self.max);
        self.recovering = None;
        self.current < self.max
    }

    pub fn needs_recovery(&self) -> bool {
        self.current < self.max && self.recovering.is_none()
    }
}

fn cooldown_application(
    owner: UnitId,
    id: String,
    seconds: f32,
    granted: Option<&GameplayTag>,
    purpose: EffectPurpose,
    config: &RuntimeConfig,
) -> EffectApplication {
    let mut definition = EffectDefinition::new(id).with_duration(DurationPolicy::seconds(seconds));
    if let Some(tag) = granted {
        definition.tags.activation_owned.add(tag.clone());
    }
    EffectApplication {
        definition: Arc::new(definition),
        source: owner,
        target: owner,
        modifiers: Vec::new(),
        duration: Some(config.frames_from_seconds(seconds)),
        period: None,
        magnitudes: MagnitudeContext::default(),
        origin: None,
        purpose,
    }
}

/// Effect application that puts a normal cooldown on `skill`.
pub fn normal_cooldown(
    owner: UnitId,
    skill: SkillId,
    duration: f32,
    tag: &GameplayTag,
    config: &RuntimeConfig,
) -> EffectApplication {
    cooldown_application(
        owner,
        format!("Cooldown/{skill}"),
        duration,
        Some(tag),
        EffectPurpose::Cooldown(skill),
        config,
    )
}

/// Effect application for one charge recovery slot of `skill`.
pub fn charge_recovery(
    owner: UnitId,
    skill: SkillId,
    charge_time: f32,
    tag: Option<&GameplayTag>,
    config: &RuntimeConfig,
) -> EffectApplication {
    cooldown_application(
        owner,
        format!("ChargeRecovery/{skill}"),
        charge_time,
        tag,
        EffectPurpose::ChargeRecovery(skill),
        config,
    )
}
