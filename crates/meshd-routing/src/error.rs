//! Routing engine error types.

/// A dampener configuration that is not logically consistent.
///
/// Raised at startup; the daemon refuses to run with these, since a bad
/// threshold ordering silently disables suppression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DampenerConfigError {
    #[error("half life must be positive")]
    NonPositiveHalfLife,

    #[error("max suppress time must be positive")]
    NonPositiveMaxSuppress,

    #[error("penalty increment must be positive")]
    NonPositivePenaltyIncrement,

    #[error("reuse limit {reuse} must be positive and below suppress limit {suppress}")]
    ReuseNotBelowSuppress { reuse: f64, suppress: f64 },

    #[error("penalty increment {increment} exceeds max penalty {max_penalty}")]
    IncrementAboveMaxPenalty { increment: f64, max_penalty: f64 },
}
