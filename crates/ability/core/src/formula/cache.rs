use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::{Formula, FormulaError, FormulaScope, evaluate};
use crate::error::RuntimeError;

/// Parses each distinct formula text once and reports each failing text once.
#[derive(Clone, Debug, Default)]
pub struct FormulaCache {
    parsed: BTreeMap<String, Result<Formula, FormulaError>>,
    reported: BTreeSet<String>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed formula for `text`, parsing on first use.
    pub fn get(&mut self, text: &str) -> Result<&Formula, &FormulaError> {
        self.parsed
            .entry(text.to_owned())
            .or_insert_with(|| Formula::parse(text))
            .as_ref()
    }

    /// Evaluates `text`, substituting `fallback` on any failure.
    ///
    /// The first failure of a given text is logged at warn level; repeats are
    /// silent.
    pub fn evaluate_or(&mut self, text: &str, scope: &dyn FormulaScope, fallback: f32) -> f32 {
        let result = match self.get(text) {
            Ok(formula) => evaluate(formula, scope),
            Err(error) => Err(error.clone()),
        };
        match result {
            Ok(value) => value,
            Err(error) => {
                if self.reported.insert(text.to_owned()) {
                    warn!(
                        formula = text,
                        code = error.error_code(),
                        %error,
                        fallback,
                        "invalid formula, using fallback"
                    );
                }
                fallback
            }
        }
    }

    /// Number of distinct formula texts that failed and were reported.
    pub fn reported_failures(&self) -> usize {
        self.reported.len()
    }
}
