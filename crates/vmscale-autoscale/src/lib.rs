//! vmscale-autoscale — threshold-based fleet sizing.
//!
//! Turns a CPU utilization signal and the current fleet size into a new
//! fleet size. The policy is memoryless: the same inputs always produce
//! the same output.
//!
//! # Scaling Algorithm
//!
//! ```text
//! if signal is absent:
//!     keep current
//!
//! if value > high_threshold:
//!     desired = current + scale_step_up
//! elif value < low_threshold and current > min_units:
//!     desired = current - scale_step_down
//! else:
//!     desired = current
//!
//! result = clamp(desired, min_units, max_units)
//! ```
//!
//! Values exactly on a threshold fall in the dead band. When
//! `low_threshold > high_threshold` the scale-up branch wins, since it is
//! evaluated first.

pub mod policy;

pub use policy::{PolicyConfig, PolicyError, ScaleDecision, ScalingPolicy};
