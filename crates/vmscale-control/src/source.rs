//! Signal sources — where each tick's utilization signal comes from.

use std::sync::Arc;

use vmscale_core::{LogSchema, Signal, Subject};
use vmscale_forecast::PredictionTable;
use vmscale_sim::FleetManager;

/// What a source observed at one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub subject: Subject,
    /// `None` means no signal is available this tick.
    pub signal: Option<Signal>,
}

/// Produces the decision signal for a tick.
pub trait SignalSource {
    /// Column layout used when logging this source's samples.
    fn schema(&self) -> LogSchema;

    fn sample(&mut self, slot: u64, fleet: &dyn FleetManager) -> Sample;
}

/// Forecast-driven: the tracked unit's forecast for the slot sizes the
/// whole fleet.
#[derive(Debug, Clone)]
pub struct ForecastSource {
    table: Arc<PredictionTable>,
    tracked_unit: i64,
}

impl ForecastSource {
    pub fn new(table: Arc<PredictionTable>, tracked_unit: i64) -> Self {
        Self {
            table,
            tracked_unit,
        }
    }
}

impl SignalSource for ForecastSource {
    fn schema(&self) -> LogSchema {
        LogSchema::PerUnit
    }

    fn sample(&mut self, slot: u64, _fleet: &dyn FleetManager) -> Sample {
        Sample {
            subject: Subject::Unit(self.tracked_unit),
            signal: self
                .table
                .lookup(self.tracked_unit, slot)
                .map(|rec| rec.signal()),
        }
    }
}

/// Reactive: mean current utilization across the fleet, in percent.
///
/// An empty fleet reads as 0% rather than as a missing signal, so the
/// policy lifts the fleet back to its floor.
#[derive(Debug, Clone)]
pub struct ReactiveSource {
    overload_threshold: f64,
}

impl ReactiveSource {
    /// `overload_threshold` only sets the `overloaded` flag on samples.
    pub fn new(overload_threshold: f64) -> Self {
        Self { overload_threshold }
    }
}

impl SignalSource for ReactiveSource {
    fn schema(&self) -> LogSchema {
        LogSchema::Aggregate
    }

    fn sample(&mut self, _slot: u64, fleet: &dyn FleetManager) -> Sample {
        let units = fleet.units();
        let value = if units.is_empty() {
            0.0
        } else {
            let total: f64 = units.iter().map(|&u| fleet.utilization(u) * 100.0).sum();
            total / units.len() as f64
        };

        Sample {
            subject: Subject::Aggregate,
            signal: Some(Signal::new(value, value > self.overload_threshold)),
        }
    }
}

/// Static baseline: never produces a signal.
#[derive(Debug, Clone)]
pub struct StaticSource {
    tracked_unit: i64,
}

impl StaticSource {
    /// `tracked_unit` is only written to the log so baseline runs line up
    /// with predictive ones.
    pub fn new(tracked_unit: i64) -> Self {
        Self { tracked_unit }
    }
}

impl SignalSource for StaticSource {
    fn schema(&self) -> LogSchema {
        LogSchema::PerUnit
    }

    fn sample(&mut self, _slot: u64, _fleet: &dyn FleetManager) -> Sample {
        Sample {
            subject: Subject::Unit(self.tracked_unit),
            signal: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmscale_sim::UnitId;

    struct FixedFleet(Vec<f64>);

    impl FleetManager for FixedFleet {
        fn size(&self) -> u32 {
            self.0.len() as u32
        }
        fn units(&self) -> Vec<UnitId> {
            (0..self.0.len() as u64).map(UnitId).collect()
        }
        fn utilization(&self, unit: UnitId) -> f64 {
            self.0[unit.0 as usize]
        }
        fn add_units(&mut self, _count: u32) -> Vec<UnitId> {
            Vec::new()
        }
        fn remove_unit(&mut self, _unit: UnitId) -> bool {
            false
        }
    }

    fn table() -> Arc<PredictionTable> {
        let csv = "slot,vm_id,t,th,p,ph\n0,1,30.0,0,85.0,1\n1,2,10.0,0,12.0,0\n";
        Arc::new(PredictionTable::from_reader(csv.as_bytes(), "test").unwrap())
    }

    #[test]
    fn forecast_source_tracks_one_unit() {
        let mut source = ForecastSource::new(table(), 1);
        let fleet = FixedFleet(vec![0.1]);

        let sample = source.sample(0, &fleet);
        assert_eq!(sample.subject, Subject::Unit(1));
        assert_eq!(sample.signal, Some(Signal::new(85.0, true)));

        // Slot 1 only has a forecast for unit 2.
        assert_eq!(source.sample(1, &fleet).signal, None);
    }

    #[test]
    fn reactive_source_averages_percent() {
        let mut source = ReactiveSource::new(80.0);
        let fleet = FixedFleet(vec![1.0, 0.5, 0.0, 0.5]);

        let sample = source.sample(7, &fleet);
        assert_eq!(sample.subject, Subject::Aggregate);
        assert_eq!(sample.signal, Some(Signal::new(50.0, false)));

        let busy = FixedFleet(vec![1.0, 0.9]);
        assert!(source.sample(0, &busy).signal.unwrap().overloaded);
    }

    #[test]
    fn reactive_source_empty_fleet_reads_zero() {
        let mut source = ReactiveSource::new(80.0);
        let sample = source.sample(0, &FixedFleet(Vec::new()));
        assert_eq!(sample.signal, Some(Signal::new(0.0, false)));
    }

    #[test]
    fn static_source_has_no_signal() {
        let mut source = StaticSource::new(1);
        let sample = source.sample(3, &FixedFleet(vec![1.0]));
        assert_eq!(sample.signal, None);
        assert_eq!(sample.subject, Subject::Unit(1));
        assert_eq!(source.schema(), LogSchema::PerUnit);
    }
}
