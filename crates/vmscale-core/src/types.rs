//! Shared types used across vmscale crates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// A utilization observation fed to the scaling policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// CPU utilization in percent.
    pub value: f64,
    /// Whether the producer of the signal flagged it as an overload.
    pub overloaded: bool,
}

impl Signal {
    pub fn new(value: f64, overloaded: bool) -> Self {
        Self { value, overloaded }
    }
}

/// What a decision was based on: one tracked fleet member, or the whole fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    Unit(i64),
    Aggregate,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Unit(id) => write!(f, "{id}"),
            Subject::Aggregate => f.write_str("aggregate"),
        }
    }
}

/// One line of the decision log, captured before any scaling is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub time: f64,
    pub slot: u64,
    pub subject: Subject,
    /// `None` when no signal was available this tick.
    pub signal_value: Option<f64>,
    /// Fleet size observed at the tick, before the decision was applied.
    pub fleet_size: u32,
}

/// Column layout of the decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSchema {
    /// `time,slot,vm_id,pred_cpu,vm_count`
    PerUnit,
    /// `time,slot,avg_cpu_percent,vm_count`
    Aggregate,
}

impl LogSchema {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            LogSchema::PerUnit => &["time", "slot", "vm_id", "pred_cpu", "vm_count"],
            LogSchema::Aggregate => &["time", "slot", "avg_cpu_percent", "vm_count"],
        }
    }
}

/// Which signal drives the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Offline per-slot forecasts of a tracked unit.
    Predictive,
    /// Current fleet-wide average utilization.
    Reactive,
    /// Fixed fleet, decisions are never taken.
    Static,
}

impl ScaleMode {
    pub fn label(&self) -> &'static str {
        match self {
            ScaleMode::Predictive => "predictive",
            ScaleMode::Reactive => "reactive",
            ScaleMode::Static => "static",
        }
    }

    pub fn schema(&self) -> LogSchema {
        match self {
            ScaleMode::Reactive => LogSchema::Aggregate,
            ScaleMode::Predictive | ScaleMode::Static => LogSchema::PerUnit,
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScaleMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "predictive" | "forecast" => Ok(ScaleMode::Predictive),
            "reactive" => Ok(ScaleMode::Reactive),
            "static" | "baseline" => Ok(ScaleMode::Static),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}
