//! Numeric formula expressions.
//!
//! Authored magnitudes such as `"Caster.Attack * 1.5 + 10"` are parsed once
//! into a [`Formula`] tree and evaluated against a [`FormulaScope`] that
//! resolves named variables. Evaluation is pure: no side effects and no
//! access to the runtime beyond the scope.
//!
//! ## Grammar
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := number | ident | '(' expr ')'
//! ident   := (letter | '_') (letter | digit | '_' | '.')*
//! ```
//!
//! Letters include non-ASCII alphabetic characters, so context keys authored
//! in any script are valid identifiers.
//!
//! ## Examples
//!
//! ```
//! # use ability_core::formula::{Formula, evaluate};
//! # use std::collections::BTreeMap;
//! let formula = Formula::parse("(Caster.Attack + 10) * StackCount").unwrap();
//! let scope = BTreeMap::from([
//!     ("Caster.Attack".to_string(), 20.0_f32),
//!     ("StackCount".to_string(), 2.0),
//! ]);
//! assert_eq!(evaluate(&formula, &scope).unwrap(), 60.0);
//! ```

mod cache;
mod evaluate;
mod parse;

pub use cache::FormulaCache;
pub use evaluate::{FormulaScope, evaluate};

use crate::error::{ErrorSeverity, RuntimeError};

// ============================================================================
// Formula Definition
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed formula tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Formula {
    /// Numeric literal.
    Number(f32),

    /// Named variable resolved through the scope.
    Variable(String),

    /// Unary negation.
    Neg(Box<Formula>),

    Binary {
        op: BinaryOp,
        lhs: Box<Formula>,
        rhs: Box<Formula>,
    },
}

impl Formula {
    /// Parses formula text.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] describing the first syntax error.
    pub fn parse(text: &str) -> Result<Self, FormulaError> {
        parse::Parser::new(text).parse()
    }

    /// Constant value, if the formula is a bare literal.
    pub fn as_constant(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Collects every variable name referenced by the formula.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Number(_) => {}
            Self::Variable(name) => names.push(name),
            Self::Neg(inner) => inner.collect_variables(names),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Formula parse or evaluation failure.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token '{found}' at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("formula produced a non-finite value")]
    NonFinite,
}

impl RuntimeError for FormulaError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        use FormulaError::*;
        match self {
            UnexpectedChar { .. } => "FORMULA_UNEXPECTED_CHAR",
            InvalidNumber(_) => "FORMULA_INVALID_NUMBER",
            UnexpectedToken { .. } => "FORMULA_UNEXPECTED_TOKEN",
            UnexpectedEnd => "FORMULA_UNEXPECTED_END",
            TooDeep { .. } => "FORMULA_TOO_DEEP",
            UnknownVariable(_) => "FORMULA_UNKNOWN_VARIABLE",
            DivisionByZero => "FORMULA_DIVISION_BY_ZERO",
            NonFinite => "FORMULA_NON_FINITE",
        }
    }
}
