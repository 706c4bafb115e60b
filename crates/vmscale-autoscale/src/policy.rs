//! Scaling policy — hysteresis thresholds plus hard fleet bounds.
//!
//! The policy is validated once at construction; after that `decide` is a
//! total function over any signal and any current size.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use vmscale_core::Signal;
use vmscale_core::config::PolicySection;

/// Errors raised when building a policy from an invalid configuration.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("min_units must be greater than zero")]
    ZeroMinimum,

    #[error("min_units ({min}) exceeds max_units ({max})")]
    InvertedBounds { min: u32, max: u32 },

    #[error("{0} must be greater than zero")]
    ZeroStep(&'static str),

    #[error("{0} must be a finite number")]
    NonFiniteThreshold(&'static str),
}

/// Immutable policy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Scale up when utilization (percent) is strictly above this.
    pub high_threshold: f64,
    /// Scale down when utilization (percent) is strictly below this.
    pub low_threshold: f64,
    pub min_units: u32,
    pub max_units: u32,
    pub scale_step_up: u32,
    pub scale_step_down: u32,
}

impl From<&PolicySection> for PolicyConfig {
    fn from(section: &PolicySection) -> Self {
        Self {
            high_threshold: section.high_threshold,
            low_threshold: section.low_threshold,
            min_units: section.min_units,
            max_units: section.max_units,
            scale_step_up: section.scale_step_up,
            scale_step_down: section.scale_step_down,
        }
    }
}

/// A scaling decision for the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Scale to the specified unit count.
    ScaleTo(u32),
    /// No change needed.
    NoChange,
}

/// Threshold policy with hysteresis.
#[derive(Debug, Clone)]
pub struct ScalingPolicy {
    config: PolicyConfig,
}

impl ScalingPolicy {
    /// Build a policy, rejecting configurations that could violate the
    /// `[min_units, max_units]` bound.
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyError> {
        if !config.high_threshold.is_finite() {
            return Err(PolicyError::NonFiniteThreshold("high_threshold"));
        }
        if !config.low_threshold.is_finite() {
            return Err(PolicyError::NonFiniteThreshold("low_threshold"));
        }
        if config.min_units == 0 {
            return Err(PolicyError::ZeroMinimum);
        }
        if config.min_units > config.max_units {
            return Err(PolicyError::InvertedBounds {
                min: config.min_units,
                max: config.max_units,
            });
        }
        if config.scale_step_up == 0 {
            return Err(PolicyError::ZeroStep("scale_step_up"));
        }
        if config.scale_step_down == 0 {
            return Err(PolicyError::ZeroStep("scale_step_down"));
        }

        if config.low_threshold >= config.high_threshold {
            warn!(
                low = config.low_threshold,
                high = config.high_threshold,
                "low_threshold is not below high_threshold; scale-up takes precedence"
            );
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Decide the new fleet size given a signal and the current size.
    ///
    /// An absent signal keeps the current size, even when it lies outside
    /// the configured bounds.
    pub fn decide(&self, signal: Option<Signal>, current: u32) -> u32 {
        let Some(signal) = signal else {
            return current;
        };

        let cfg = &self.config;
        let desired = if signal.value > cfg.high_threshold {
            current.saturating_add(cfg.scale_step_up)
        } else if signal.value < cfg.low_threshold && current > cfg.min_units {
            current.saturating_sub(cfg.scale_step_down)
        } else {
            current
        };

        let clamped = desired.clamp(cfg.min_units, cfg.max_units);

        debug!(
            value = signal.value,
            overloaded = signal.overloaded,
            from = current,
            to = clamped,
            "policy decision"
        );
        clamped
    }

    /// Like [`decide`](Self::decide), expressed as a change request.
    pub fn evaluate(&self, signal: Option<Signal>, current: u32) -> ScaleDecision {
        match self.decide(signal, current) {
            n if n == current => ScaleDecision::NoChange,
            n => ScaleDecision::ScaleTo(n),
        }
    }
}
