//! Formula evaluation.

use std::collections::BTreeMap;

use super::{BinaryOp, Formula, FormulaError};

/// Resolves formula variables to values.
pub trait FormulaScope {
    fn variable(&self, name: &str) -> Option<f32>;
}

impl FormulaScope for BTreeMap<String, f32> {
    fn variable(&self, name: &str) -> Option<f32> {
        self.get(name).copied()
    }
}

impl<S: FormulaScope + ?Sized> FormulaScope for &S {
    fn variable(&self, name: &str) -> Option<f32> {
        (**self).variable(name)
    }
}

/// Evaluates a formula in f32 arithmetic.
///
/// # Errors
///
/// - `UnknownVariable` if the scope cannot resolve a name
/// - `DivisionByZero` for a zero divisor
/// - `NonFinite` if any intermediate result is NaN or infinite
pub fn evaluate(formula: &Formula, scope: &dyn FormulaScope) -> Result<f32, FormulaError> {
    let value = match formula {
        Formula::Number(value) => *value,
        Formula::Variable(name) => scope
            .variable(name)
            .ok_or_else(|| FormulaError::UnknownVariable(name.clone()))?,
        Formula::Neg(inner) => -evaluate(inner, scope)?,
        Formula::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, scope)?;
            let rhs = evaluate(rhs, scope)?;
            match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => {
                    if rhs == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    lhs / rhs
                }
            }
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, vars: &[(&str, f32)]) -> Result<f32, FormulaError> {
        let scope: BTreeMap<String, f32> =
            vars.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        evaluate(&Formula::parse(text)?, &scope)
    }

    #[test]
    fn arithmetic_follows_precedence() {
        assert_eq!(eval("2 + 3 * 4", &[]), Ok(14.0));
        assert_eq!(eval("(2 + 3) * 4", &[]), Ok(20.0));
        assert_eq!(eval("10 / 4 - -1", &[]), Ok(3.5));
    }

    #[test]
    fn variables_resolve_through_scope() {
        assert_eq!(eval("Target.Defense * 0.5", &[("Target.Defense", 40.0)]), Ok(20.0));
        assert_eq!(
            eval("Missing + 1", &[]),
            Err(FormulaError::UnknownVariable("Missing".into()))
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(eval("1 / (2 - 2)", &[]), Err(FormulaError::DivisionByZero));
    }
}
