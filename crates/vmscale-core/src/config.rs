//! vmscale.toml configuration parser.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the baseline experiment: thresholds 80/20, fleet bounds 1..=10, single
//! step scaling, two initial VMs and twenty workload units.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ScaleMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scaling mode: {0}")]
    UnknownMode(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("predictive mode requires [forecast].table")]
    MissingTable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub policy: PolicySection,
    pub forecast: ForecastSection,
    pub fleet: FleetSection,
    pub log: LogSection,
    pub simulation: SimulationSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub high_threshold: f64,
    pub low_threshold: f64,
    pub min_units: u32,
    pub max_units: u32,
    pub scale_step_up: u32,
    pub scale_step_down: u32,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            high_threshold: 80.0,
            low_threshold: 20.0,
            min_units: 1,
            max_units: 10,
            scale_step_up: 1,
            scale_step_down: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSection {
    /// Path of the forecast CSV. Only read in predictive mode.
    pub table: Option<PathBuf>,
    /// The unit whose forecasts drive the whole fleet.
    pub tracked_unit: i64,
}

impl Default for ForecastSection {
    fn default() -> Self {
        Self {
            table: None,
            tracked_unit: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSection {
    pub initial_units: u32,
    pub workload_units: u32,
}

impl Default for FleetSection {
    fn default() -> Self {
        Self {
            initial_units: 2,
            workload_units: 20,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Decision log destination. Defaults to `results_<mode>.csv`.
    pub path: Option<PathBuf>,
}

impl LogSection {
    pub fn resolved_path(&self, mode: ScaleMode) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("results_{}.csv", mode.label())))
    }
}

/// Parameters of the simulated datacenter. These are passed through to the
/// simulator unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub hosts: u32,
    pub pes_per_host: u32,
    /// Per-PE speed, shared by hosts and VMs.
    pub mips: f64,
    pub vm_pes: u32,
    /// Instructions (MI per PE) needed by one workload unit.
    pub workload_length: f64,
    pub workload_pes: u32,
    pub tick_interval: f64,
    pub max_time: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            hosts: 2,
            pes_per_host: 4,
            mips: 1000.0,
            vm_pes: 2,
            workload_length: 10_000.0,
            workload_pes: 2,
            tick_interval: 1.0,
            max_time: 86_400.0,
        }
    }
}

impl ScaleConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScaleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the fleet and simulation parameters for the given mode.
    ///
    /// Policy bounds are checked when the policy itself is built.
    pub fn validate(&self, mode: ScaleMode) -> Result<(), ConfigError> {
        if mode == ScaleMode::Predictive && self.forecast.table.is_none() {
            return Err(ConfigError::MissingTable);
        }

        let sim = &self.simulation;
        positive("simulation.hosts", sim.hosts)?;
        positive("simulation.pes_per_host", sim.pes_per_host)?;
        positive("simulation.vm_pes", sim.vm_pes)?;
        positive("simulation.workload_pes", sim.workload_pes)?;
        positive_f64("simulation.mips", sim.mips)?;
        positive_f64("simulation.workload_length", sim.workload_length)?;
        positive_f64("simulation.tick_interval", sim.tick_interval)?;
        positive_f64("simulation.max_time", sim.max_time)?;

        if sim.workload_pes > sim.vm_pes {
            return Err(ConfigError::Invalid {
                field: "simulation.workload_pes",
                reason: format!(
                    "{} exceeds simulation.vm_pes ({})",
                    sim.workload_pes, sim.vm_pes
                ),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn positive_f64(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is not a positive number"),
        });
    }
    Ok(())
}
