//! vmscale-forecast — offline CPU forecasts for the predictive control loop.
//!
//! Forecasts are produced elsewhere and consumed read-only. The table is
//! loaded once at startup, shared behind an `Arc`, and never mutated.

pub mod error;
pub mod record;
pub mod table;

pub use error::{LoadError, LoadResult};
pub use record::ForecastRecord;
pub use table::PredictionTable;
