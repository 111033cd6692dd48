//! Modifier magnitudes.
//!
//! A magnitude is authored in one of four ways and resolved to an `f32` when
//! an effect applies:
//!
//! - [`Magnitude::FixedValue`]: literal
//! - [`Magnitude::Formula`]: expression text, see [`crate::formula`]
//! - [`Magnitude::Mmc`]: named [`MagnitudeCalculation`] over a captured
//!   caster or target attribute
//! - [`Magnitude::SetByCaller`]: keyed value supplied by the activation
//!
//! Non-snapshot MMC captures are "live": the runtime re-resolves them every
//! tick and updates the modifier in place.

mod calculation;

pub use calculation::{
    LinearCalculation, MagnitudeCalculation, MagnitudeCalculations, ReciprocalCalculation,
};

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::attribute::{AttributeKind, Attributes};
use crate::formula::{FormulaCache, FormulaScope};

// ============================================================================
// Definitions
// ============================================================================

/// Whose attribute an MMC reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CaptureSource {
    Caster,
    Target,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeCapture {
    pub attribute: AttributeKind,
    pub source: CaptureSource,
    /// Read once at apply time when true, every tick otherwise.
    pub snapshot: bool,
}

/// Modifier magnitude calculation parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MmcMagnitude {
    /// Registered strategy name, e.g. `"Linear"`.
    pub calculation: String,
    pub capture: AttributeCapture,
    pub coefficient: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub pre_add: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub post_add: f32,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Magnitude {
    FixedValue(f32),
    Formula(String),
    Mmc(MmcMagnitude),
    SetByCaller { key: String, default: f32 },
}

impl Magnitude {
    pub fn fixed(value: f32) -> Self {
        Self::FixedValue(value)
    }

    pub fn formula(text: impl Into<String>) -> Self {
        Self::Formula(text.into())
    }

    /// True for MMC magnitudes that re-read their captured attribute.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Mmc(mmc) if !mmc.capture.snapshot)
    }
}

impl Default for Magnitude {
    fn default() -> Self {
        Self::FixedValue(0.0)
    }
}

impl From<f32> for Magnitude {
    fn from(value: f32) -> Self {
        Self::FixedValue(value)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Per-application values carried from the triggering context.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagnitudeContext {
    pub level: u32,
    pub values: BTreeMap<String, f32>,
    pub set_by_caller: BTreeMap<String, f32>,
}

/// Everything a magnitude may read while resolving.
#[derive(Clone, Copy, Debug)]
pub struct MagnitudeInputs<'a> {
    pub caster: Option<&'a Attributes>,
    pub target: Option<&'a Attributes>,
    pub stack_count: u32,
    pub context: &'a MagnitudeContext,
}

impl<'a> MagnitudeInputs<'a> {
    pub fn new(context: &'a MagnitudeContext) -> Self {
        Self {
            caster: None,
            target: None,
            stack_count: 1,
            context,
        }
    }

    pub fn with_caster(mut self, caster: Option<&'a Attributes>) -> Self {
        self.caster = caster;
        self
    }

    pub fn with_target(mut self, target: Option<&'a Attributes>) -> Self {
        self.target = target;
        self
    }

    pub fn with_stack_count(mut self, stack_count: u32) -> Self {
        self.stack_count = stack_count;
        self
    }

    fn captured(&self, capture: &AttributeCapture) -> f32 {
        let attributes = match capture.source {
            CaptureSource::Caster => self.caster,
            CaptureSource::Target => self.target,
        };
        attributes
            .and_then(|attrs| attrs.get_current_value(capture.attribute))
            .unwrap_or(0.0)
    }
}

/// Variables visible to formulas:
/// `StackCount`, `Level`, `Caster.<Attribute>`, `Target.<Attribute>`,
/// then context values and SetByCaller keys by exact name.
impl FormulaScope for MagnitudeInputs<'_> {
    fn variable(&self, name: &str) -> Option<f32> {
        match name {
            "StackCount" => return Some(self.stack_count as f32),
            "Level" => return Some(self.context.level as f32),
            _ => {}
        }
        if let Some(attribute) = name.strip_prefix("Caster.") {
            let kind = AttributeKind::from_str(attribute).ok()?;
            return self.caster?.get_current_value(kind);
        }
        if let Some(attribute) = name.strip_prefix("Target.") {
            let kind = AttributeKind::from_str(attribute).ok()?;
            return self.target?.get_current_value(kind);
        }
        self.context
            .values
            .get(name)
            .or_else(|| self.context.set_by_caller.get(name))
            .copied()
    }
}

/// Shared resolution services owned by the runtime.
#[derive(Debug)]
pub struct MagnitudeResolver<'r> {
    pub formulas: &'r mut FormulaCache,
    pub calculations: &'r MagnitudeCalculations,
    pub fallback: f32,
}

impl MagnitudeResolver<'_> {
    /// Resolves a magnitude to a single value.
    ///
    /// Invalid formulas resolve to the configured fallback; missing
    /// SetByCaller keys resolve to their authored default.
    pub fn resolve(&mut self, magnitude: &Magnitude, inputs: &MagnitudeInputs<'_>) -> f32 {
        match magnitude {
            Magnitude::FixedValue(value) => *value,
            Magnitude::Formula(text) => self.formulas.evaluate_or(text, inputs, self.fallback),
            Magnitude::Mmc(params) => {
                let captured = inputs.captured(&params.capture);
                self.calculations.calculate(captured, params)
            }
            Magnitude::SetByCaller { key, default } => inputs
                .context
                .set_by_caller
                .get(key)
                .copied()
                .unwrap_or(*default),
        }
    }
}
