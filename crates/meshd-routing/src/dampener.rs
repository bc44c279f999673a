//! Penalty-based route dampening.
//!
//! A single-flow suppression state machine modeled on BGP route flap
//! damping: every flap adds a fixed penalty, the penalty decays
//! exponentially with a configured half-life, and the flow is suppressed
//! between the suppress and reuse thresholds. Deployed only at the mesh
//! edge, where the network effects that make BGP-wide dampening risky do
//! not apply.
//!
//! Decay is lazy: it runs inside [`RouteDampener::flap`] and on the
//! explicit [`RouteDampener::decay`] tick, so the machine needs no timer of
//! its own and stays a pure function of `(events, now)`.

use crate::error::DampenerConfigError;

/// Dampener thresholds and timing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampenerConfig {
    /// Penalty added per flap.
    pub penalty_increment: f64,
    /// Penalty at or above which the flow is suppressed.
    pub suppress_limit: f64,
    /// Penalty at or below which a suppressed flow is released.
    pub reuse_limit: f64,
    /// Time for the penalty to halve, in milliseconds.
    pub half_life_ms: u64,
    /// Longest time a flow may stay suppressed, in milliseconds. Bounds the
    /// penalty ceiling rather than arming a timer.
    pub max_suppress_ms: u64,
}

impl DampenerConfig {
    /// The penalty ceiling: a penalty at this value decays to the suppress
    /// limit in exactly `max_suppress_ms`.
    #[must_use]
    pub fn max_penalty(&self) -> f64 {
        let half_lives = self.max_suppress_ms as f64 / self.half_life_ms.max(1) as f64;
        self.suppress_limit * 2f64.powf(half_lives)
    }

    /// Check the threshold ordering `0 < reuse < suppress < max_penalty`.
    pub fn validate(&self) -> Result<(), DampenerConfigError> {
        if self.half_life_ms == 0 {
            return Err(DampenerConfigError::NonPositiveHalfLife);
        }
        if self.max_suppress_ms == 0 {
            return Err(DampenerConfigError::NonPositiveMaxSuppress);
        }
        if self.penalty_increment <= 0.0 {
            return Err(DampenerConfigError::NonPositivePenaltyIncrement);
        }
        if self.reuse_limit <= 0.0 || self.reuse_limit >= self.suppress_limit {
            return Err(DampenerConfigError::ReuseNotBelowSuppress {
                reuse: self.reuse_limit,
                suppress: self.suppress_limit,
            });
        }
        let max_penalty = self.max_penalty();
        if self.penalty_increment > max_penalty {
            return Err(DampenerConfigError::IncrementAboveMaxPenalty {
                increment: self.penalty_increment,
                max_penalty,
            });
        }
        Ok(())
    }
}

/// State transition produced by a dampener operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DampenerEvent {
    /// The flow crossed the suppress limit and is now dampened.
    Dampened,
    /// The penalty decayed to the reuse limit and the flow is released.
    Undampened,
}

/// The dampening state machine.
#[derive(Debug)]
#[must_use]
pub struct RouteDampener {
    config: DampenerConfig,
    penalty: f64,
    suppressed: bool,
    last_update_ms: u64,
}

impl RouteDampener {
    /// Create a dampener, validating the configuration.
    pub fn new(config: DampenerConfig, now_ms: u64) -> Result<Self, DampenerConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            penalty: 0.0,
            suppressed: false,
            last_update_ms: now_ms,
        })
    }

    /// Record one undesirable event.
    ///
    /// Returns [`DampenerEvent::Dampened`] exactly when this flap crosses
    /// the suppress limit; flaps while already suppressed extend the
    /// suppression (more penalty to decay) without a second event.
    pub fn flap(&mut self, now_ms: u64) -> Option<DampenerEvent> {
        self.decay_to(now_ms);
        self.penalty = (self.penalty + self.config.penalty_increment)
            .min(self.config.max_penalty());
        tracing::debug!(penalty = self.penalty, "route dampener received flap");

        if !self.suppressed && self.penalty >= self.config.suppress_limit {
            self.suppressed = true;
            tracing::info!(penalty = self.penalty, "route dampener suppressing");
            return Some(DampenerEvent::Dampened);
        }
        None
    }

    /// Decay the penalty to `now_ms` and release the flow if it reached the
    /// reuse limit.
    pub fn decay(&mut self, now_ms: u64) -> Option<DampenerEvent> {
        self.decay_to(now_ms);
        if self.suppressed && self.penalty <= self.config.reuse_limit {
            self.suppressed = false;
            tracing::info!(penalty = self.penalty, "route dampener releasing");
            return Some(DampenerEvent::Undampened);
        }
        None
    }

    /// Whether the flow is currently suppressed.
    #[must_use]
    pub fn is_dampened(&self) -> bool {
        self.suppressed
    }

    /// The decayed penalty as of the last update.
    #[must_use]
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    fn decay_to(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.last_update_ms);
        if elapsed > 0 {
            let half_lives = elapsed as f64 / self.config.half_life_ms as f64;
            self.penalty *= 0.5f64.powf(half_lives);
            self.last_update_ms = now_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: u64 = 1_000;

    fn config() -> DampenerConfig {
        DampenerConfig {
            penalty_increment: 1_000.0,
            suppress_limit: 2_000.0,
            reuse_limit: 750.0,
            half_life_ms: 900 * SECOND,
            max_suppress_ms: 3_600 * SECOND,
        }
    }

    #[test]
    fn single_flap_does_not_suppress() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        assert_eq!(rd.flap(0), None);
        assert!(!rd.is_dampened());
        assert_eq!(rd.penalty(), 1_000.0);
    }

    #[test]
    fn suppression_at_limit_is_inclusive() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        assert_eq!(rd.flap(0), None);
        // 2000 >= 2000: crossed.
        assert_eq!(rd.flap(0), Some(DampenerEvent::Dampened));
        assert!(rd.is_dampened());
    }

    #[test]
    fn three_flaps_then_half_life_decay_releases() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        rd.flap(0);
        rd.flap(0);
        rd.flap(0);
        assert!(rd.is_dampened());
        assert_eq!(rd.penalty(), 3_000.0);

        // One half-life: ~1500, still suppressed.
        assert_eq!(rd.decay(900 * SECOND), None);
        assert!((rd.penalty() - 1_500.0).abs() < 1.0);
        assert!(rd.is_dampened());

        // Second half-life: ~750 <= reuse limit, released.
        assert_eq!(rd.decay(1_800 * SECOND), Some(DampenerEvent::Undampened));
        assert!((rd.penalty() - 750.0).abs() < 1.0);
        assert!(!rd.is_dampened());
    }

    #[test]
    fn flap_while_suppressed_extends_without_second_event() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        rd.flap(0);
        assert_eq!(rd.flap(0), Some(DampenerEvent::Dampened));
        assert_eq!(rd.flap(0), None);
        assert_eq!(rd.flap(0), None);
        assert_eq!(rd.penalty(), 4_000.0);
        assert!(rd.is_dampened());
    }

    #[test]
    fn penalty_clamped_at_max() {
        let cfg = config();
        let max = cfg.max_penalty();
        let mut rd = RouteDampener::new(cfg, 0).unwrap();
        for _ in 0..200 {
            rd.flap(0);
        }
        assert!(rd.penalty() <= max);
        assert_eq!(rd.penalty(), max);
    }

    #[test]
    fn max_penalty_decays_to_suppress_in_max_suppress_time() {
        let cfg = config();
        let mut rd = RouteDampener::new(cfg, 0).unwrap();
        for _ in 0..200 {
            rd.flap(0);
        }
        // After max_suppress_ms the clamped penalty sits at the suppress
        // limit, so release follows within a few more half-lives.
        rd.decay(cfg.max_suppress_ms);
        assert!((rd.penalty() - cfg.suppress_limit).abs() < 1.0);
        assert!(rd.is_dampened());

        assert_eq!(
            rd.decay(cfg.max_suppress_ms + 2 * cfg.half_life_ms),
            Some(DampenerEvent::Undampened)
        );
    }

    #[test]
    fn decay_between_flaps_lowers_penalty() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        rd.flap(0);
        // One half-life later the stored 1000 decays to 500 before adding.
        rd.flap(900 * SECOND);
        assert!((rd.penalty() - 1_500.0).abs() < 1.0);
        assert!(!rd.is_dampened());
    }

    #[test]
    fn decay_without_suppression_emits_nothing() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        rd.flap(0);
        assert_eq!(rd.decay(10_000 * SECOND), None);
        assert!(!rd.is_dampened());
    }

    #[test]
    fn release_fires_once() {
        let mut rd = RouteDampener::new(config(), 0).unwrap();
        rd.flap(0);
        rd.flap(0);
        assert!(rd.is_dampened());
        assert_eq!(rd.decay(3_000 * SECOND), Some(DampenerEvent::Undampened));
        assert_eq!(rd.decay(3_100 * SECOND), None);
    }

    #[test]
    fn rejects_reuse_at_or_above_suppress() {
        let cfg = DampenerConfig {
            reuse_limit: 2_000.0,
            ..config()
        };
        assert_eq!(
            RouteDampener::new(cfg, 0).unwrap_err(),
            DampenerConfigError::ReuseNotBelowSuppress {
                reuse: 2_000.0,
                suppress: 2_000.0,
            }
        );
    }

    #[test]
    fn rejects_zero_half_life() {
        let cfg = DampenerConfig {
            half_life_ms: 0,
            ..config()
        };
        assert!(matches!(
            RouteDampener::new(cfg, 0),
            Err(DampenerConfigError::NonPositiveHalfLife)
        ));
    }

    #[test]
    fn rejects_oversized_increment() {
        // Tiny ceiling: suppress 2000 * 2^(1/900) is barely above 2000, so a
        // huge increment cannot fit below it.
        let cfg = DampenerConfig {
            penalty_increment: 1_000_000.0,
            max_suppress_ms: SECOND,
            ..config()
        };
        assert!(matches!(
            RouteDampener::new(cfg, 0),
            Err(DampenerConfigError::IncrementAboveMaxPenalty { .. })
        ));
    }

    #[test]
    fn max_penalty_formula() {
        // suppress 2000, 4 half-lives: 2000 * 2^4 = 32000.
        assert!((config().max_penalty() - 32_000.0).abs() < 1e-6);
    }
}
