//! Traits describing the runtime's external collaborators.
//!
//! Oracles expose ability graph lookup, spatial target search, presentation
//! cues, animation playback and randomness. The [`AbilityEnv`] aggregate
//! bundles them so the runtime reaches everything it needs through one
//! read-only value passed into each call, never through global state.
mod graphs;
mod presentation;
mod rng;

pub use graphs::{GraphCatalog, GraphOracle};
pub use presentation::{AnimationOracle, CueOracle, CueRequest, TargetingOracle};
pub use rng::{PcgRng, RngOracle, compute_seed};

use crate::error::{ErrorSeverity, RuntimeError};
use crate::ids::SkillId;

static DEFAULT_RNG: PcgRng = PcgRng;

/// Aggregates the oracles consumed by the runtime.
#[derive(Clone, Copy, Default)]
pub struct AbilityEnv<'a> {
    graphs: Option<&'a dyn GraphOracle>,
    targeting: Option<&'a dyn TargetingOracle>,
    cues: Option<&'a dyn CueOracle>,
    animations: Option<&'a dyn AnimationOracle>,
    rng: Option<&'a dyn RngOracle>,
}

impl<'a> AbilityEnv<'a> {
    pub fn new(graphs: &'a dyn GraphOracle) -> Self {
        Self::empty().with_graphs(graphs)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_graphs(mut self, graphs: &'a dyn GraphOracle) -> Self {
        self.graphs = Some(graphs);
        self
    }

    pub fn with_targeting(mut self, targeting: &'a dyn TargetingOracle) -> Self {
        self.targeting = Some(targeting);
        self
    }

    pub fn with_cues(mut self, cues: &'a dyn CueOracle) -> Self {
        self.cues = Some(cues);
        self
    }

    pub fn with_animations(mut self, animations: &'a dyn AnimationOracle) -> Self {
        self.animations = Some(animations);
        self
    }

    pub fn with_rng(mut self, rng: &'a dyn RngOracle) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Returns the GraphOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::GraphsNotAvailable` if no graph oracle was provided.
    pub fn graphs(&self) -> Result<&'a dyn GraphOracle, OracleError> {
        self.graphs.ok_or(OracleError::GraphsNotAvailable)
    }

    /// Returns the TargetingOracle, or an error if not available.
    ///
    /// # Errors
    ///
    /// Returns `OracleError::TargetingNotAvailable` if no targeting oracle was provided.
    pub fn targeting(&self) -> Result<&'a dyn TargetingOracle, OracleError> {
        self.targeting.ok_or(OracleError::TargetingNotAvailable)
    }

    /// Cue sink, if any. Cues are presentation-only, so a missing sink is not
    /// an error.
    pub fn cues(&self) -> Option<&'a dyn CueOracle> {
        self.cues
    }

    pub fn animations(&self) -> Option<&'a dyn AnimationOracle> {
        self.animations
    }

    /// RNG oracle, falling back to [`PcgRng`].
    pub fn rng(&self) -> &'a dyn RngOracle {
        self.rng.unwrap_or(&DEFAULT_RNG)
    }
}

impl std::fmt::Debug for AbilityEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbilityEnv")
            .field("graphs", &self.graphs.is_some())
            .field("targeting", &self.targeting.is_some())
            .field("cues", &self.cues.is_some())
            .field("animations", &self.animations.is_some())
            .field("rng", &self.rng.is_some())
            .finish()
    }
}

/// Errors that occur when accessing oracle data.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("GraphOracle not available")]
    GraphsNotAvailable,

    #[error("TargetingOracle not available")]
    TargetingNotAvailable,

    #[error("ability graph for {0} not found")]
    GraphNotFound(SkillId),
}

impl RuntimeError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        use OracleError::*;
        match self {
            GraphsNotAvailable | TargetingNotAvailable => ErrorSeverity::Fatal,
            GraphNotFound(_) => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        use OracleError::*;
        match self {
            GraphsNotAvailable => "ORACLE_GRAPHS_NOT_AVAILABLE",
            TargetingNotAvailable => "ORACLE_TARGETING_NOT_AVAILABLE",
            GraphNotFound(_) => "ORACLE_GRAPH_NOT_FOUND",
        }
    }
}
