//! Common error infrastructure for ability-core.
//!
//! Domain-specific errors (`GateRejection`, `GraphLoadError`, `FormulaError`,
//! `OracleError`) live next to the modules that produce them. This module
//! provides the classification shared by all of them.
//!
//! # Taxonomy
//!
//! - **Expected**: gate rejections. Activation simply returns `false`.
//! - **Recoverable**: dangling graph references and invalid formulas. The
//!   offending piece is skipped or replaced by a fallback value.
//! - **Validation**: missing definitions. The request is aborted.
//! - **Fatal**: malformed graphs. The graph fails to load as a whole.

/// Severity level of an error, used for categorization and log levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Normal control flow, e.g. an ability on cooldown. Never logged as error.
    Expected,

    /// Something authored is wrong, but execution continues around it.
    Recoverable,

    /// The request referenced data that does not exist.
    Validation,

    /// Content is structurally broken and cannot be used.
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expected => "expected",
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if the error belongs to ordinary gameplay flow.
    pub const fn is_expected(&self) -> bool {
        matches!(self, Self::Expected)
    }
}

/// Common trait for all ability-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity by how the caller should react, not by impact
/// - Error codes are stable SCREAMING_SNAKE identifiers usable in metrics
pub trait RuntimeError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
