use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::MmcMagnitude;

/// Pluggable modifier magnitude strategy.
///
/// Receives the captured attribute value and the authored parameters.
pub trait MagnitudeCalculation: Send + Sync {
    fn calculate(&self, captured: f32, params: &MmcMagnitude) -> f32;
}

/// `coefficient × (captured + pre_add) + post_add`
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearCalculation;

impl MagnitudeCalculation for LinearCalculation {
    fn calculate(&self, captured: f32, params: &MmcMagnitude) -> f32 {
        params.coefficient * (captured + params.pre_add) + params.post_add
    }
}

/// `coefficient / (captured + pre_add) + post_add`, `post_add` alone for a
/// zero denominator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReciprocalCalculation;

impl MagnitudeCalculation for ReciprocalCalculation {
    fn calculate(&self, captured: f32, params: &MmcMagnitude) -> f32 {
        let denominator = captured + params.pre_add;
        if denominator == 0.0 {
            return params.post_add;
        }
        params.coefficient / denominator + params.post_add
    }
}

/// Registry of named calculation strategies.
#[derive(Clone)]
pub struct MagnitudeCalculations {
    strategies: BTreeMap<String, Arc<dyn MagnitudeCalculation>>,
}

impl MagnitudeCalculations {
    pub const LINEAR: &'static str = "Linear";
    pub const RECIPROCAL: &'static str = "Reciprocal";

    pub fn new() -> Self {
        let mut registry = Self {
            strategies: BTreeMap::new(),
        };
        registry.register(Self::LINEAR, LinearCalculation);
        registry.register(Self::RECIPROCAL, ReciprocalCalculation);
        registry
    }

    /// Registers (or replaces) a strategy under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        calculation: impl MagnitudeCalculation + 'static,
    ) {
        self.strategies.insert(name.into(), Arc::new(calculation));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Runs the named strategy. Unknown names fall back to `Linear` with a
    /// warning.
    pub fn calculate(&self, captured: f32, params: &MmcMagnitude) -> f32 {
        match self.strategies.get(&params.calculation) {
            Some(strategy) => strategy.calculate(captured, params),
            None => {
                warn!(
                    calculation = %params.calculation,
                    "unknown magnitude calculation, using Linear"
                );
                LinearCalculation.calculate(captured, params)
            }
        }
    }
}

impl Default for MagnitudeCalculations {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MagnitudeCalculations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagnitudeCalculations")
            .field("strategies", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}
