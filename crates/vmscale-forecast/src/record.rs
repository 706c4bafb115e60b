//! A single forecast row.

use std::fmt;

use serde::{Deserialize, Serialize};

use vmscale_core::Signal;

/// Forecast for one fleet member at one time slot.
///
/// The `target_*` fields are ground truth kept for diagnostics; only
/// `pred_cpu_future` takes part in scaling decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub slot: u64,
    pub unit_id: i64,
    pub target_cpu_future: f64,
    pub target_high_load: bool,
    pub pred_cpu_future: f64,
    pub pred_high_load: bool,
}

impl ForecastRecord {
    /// The decision signal carried by this forecast.
    pub fn signal(&self) -> Signal {
        Signal::new(self.pred_cpu_future, self.pred_high_load)
    }
}

impl fmt::Display for ForecastRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot={}, unit={}, pred_cpu_future={}, pred_high_load={}",
            self.slot, self.unit_id, self.pred_cpu_future, self.pred_high_load as u8
        )
    }
}
