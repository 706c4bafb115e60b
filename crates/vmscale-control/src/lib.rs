//! vmscale-control — the tick-driven control loop.
//!
//! One loop shape serves all three modes; they differ only in the
//! [`SignalSource`] plugged in and the decision log schema:
//!
//! | Mode       | Source            | Policy | Log schema |
//! |------------|-------------------|--------|------------|
//! | predictive | `ForecastSource`  | yes    | per-unit   |
//! | reactive   | `ReactiveSource`  | yes    | aggregate  |
//! | static     | `StaticSource`    | no     | per-unit   |
//!
//! The loop pulls ticks from a [`vmscale_sim::Clock`] and is the only
//! writer of both the fleet and the decision log.

pub mod controller;
pub mod error;
pub mod log;
pub mod source;

pub use controller::{ControlLoop, LoopState, RunSummary};
pub use error::{ControlError, ControlResult};
pub use log::DecisionLog;
pub use source::{ForecastSource, ReactiveSource, Sample, SignalSource, StaticSource};
