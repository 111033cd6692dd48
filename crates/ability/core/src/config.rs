/// Frame-rate and traversal constants shared by every ability definition.
///
/// Authored durations are expressed in seconds and converted to frames with
/// [`RuntimeConfig::frames_from_seconds`]. The runtime itself only ever counts
/// frames handed to it by the driver.
pub struct SkillConstants;

impl SkillConstants {
    /// Default simulation rate used to convert authored seconds into frames.
    pub const DEFAULT_FPS: u32 = 30;

    /// Maximum nesting of `ExecuteConnectedNodes` calls within one pulse.
    pub const DEFAULT_MAX_EXECUTION_DEPTH: usize = 64;

    /// Upper bound on ongoing-blocked-tag re-evaluation passes per unit.
    pub const DEFAULT_MAX_TAG_REEVALUATION_PASSES: usize = 8;

    /// Value substituted when a formula fails to parse or evaluate.
    pub const DEFAULT_FORMULA_FALLBACK: f32 = 0.0;
}

/// Runtime configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    /// Frames per second of the driving simulation.
    pub fps: u32,

    /// Depth guard for graph traversal. Pulses nested deeper than this are
    /// dropped with an error log.
    pub max_execution_depth: usize,

    /// How many times a unit's running abilities and effects are re-checked
    /// against `ongoing_blocked_tags` after a single tag mutation.
    pub max_tag_reevaluation_passes: usize,

    /// Numeric fallback for invalid formulas.
    pub formula_fallback: f32,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self {
            fps: SkillConstants::DEFAULT_FPS,
            max_execution_depth: SkillConstants::DEFAULT_MAX_EXECUTION_DEPTH,
            max_tag_reevaluation_passes: SkillConstants::DEFAULT_MAX_TAG_REEVALUATION_PASSES,
            formula_fallback: SkillConstants::DEFAULT_FORMULA_FALLBACK,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn with_max_execution_depth(mut self, depth: usize) -> Self {
        self.max_execution_depth = depth;
        self
    }

    pub fn with_formula_fallback(mut self, fallback: f32) -> Self {
        self.formula_fallback = fallback;
        self
    }

    /// Converts authored seconds to whole frames, rounding to nearest.
    ///
    /// Negative and non-finite inputs collapse to zero frames.
    ///
    /// ```
    /// # use ability_core::RuntimeConfig;
    /// let config = RuntimeConfig::default();
    /// assert_eq!(config.frames_from_seconds(2.0), 60);
    /// assert_eq!(config.frames_from_seconds(-1.0), 0);
    /// ```
    pub fn frames_from_seconds(&self, seconds: f32) -> u32 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds * self.fps as f32).round() as u32
    }

    /// Converts an authored period to frames.
    ///
    /// Any positive period runs at least once per frame. Zero, negative and
    /// non-finite periods disable periodic execution.
    ///
    /// ```
    /// # use ability_core::RuntimeConfig;
    /// let config = RuntimeConfig::default();
    /// assert_eq!(config.period_frames(1.0), Some(30));
    /// assert_eq!(config.period_frames(0.01), Some(1));
    /// assert_eq!(config.period_frames(0.0), None);
    /// ```
    pub fn period_frames(&self, seconds: f32) -> Option<u32> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return None;
        }
        Some(self.frames_from_seconds(seconds).max(1))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
