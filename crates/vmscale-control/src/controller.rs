//! Control loop — one pass per clock tick.
//!
//! Each tick runs, in order:
//!
//! 1. sample the signal from the active [`SignalSource`]
//! 2. read the current fleet size
//! 3. ask the policy for a new size (skipped when there is no policy)
//! 4. append a [`DecisionRecord`] describing the pre-scaling state
//! 5. add or remove units to reach the new size
//!
//! Scale-down removes the most recently added units first.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use vmscale_autoscale::ScalingPolicy;
use vmscale_core::DecisionRecord;
use vmscale_forecast::PredictionTable;
use vmscale_sim::{Clock, FleetManager, UnitId};

use crate::error::{ControlError, ControlResult};
use crate::log::DecisionLog;
use crate::source::{ForecastSource, ReactiveSource, SignalSource, StaticSource};

/// Lifecycle of a control loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    /// Accepting ticks.
    Armed,
    /// The clock ended or shutdown was requested.
    Stopped,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    /// Ticks where the source had no signal.
    pub missing_signals: u64,
    pub scale_ups: u32,
    pub scale_downs: u32,
    pub units_added: u32,
    pub units_removed: u32,
    pub peak_size: u32,
    pub final_size: u32,
}

pub struct ControlLoop {
    source: Box<dyn SignalSource + Send>,
    /// `None` for the static baseline: decisions are never taken.
    policy: Option<ScalingPolicy>,
    log: DecisionLog,
    state: LoopState,
    summary: RunSummary,
}

impl ControlLoop {
    /// Build a loop from its parts. The log must use the source's schema.
    pub fn new(
        source: Box<dyn SignalSource + Send>,
        policy: Option<ScalingPolicy>,
        log: DecisionLog,
    ) -> Self {
        debug_assert_eq!(source.schema(), log.schema());
        Self {
            source,
            policy,
            log,
            state: LoopState::Armed,
            summary: RunSummary::default(),
        }
    }

    /// Forecast-driven loop following `tracked_unit`, logging to `path`.
    pub fn predictive(
        table: Arc<PredictionTable>,
        tracked_unit: i64,
        policy: ScalingPolicy,
        path: &Path,
    ) -> ControlResult<Self> {
        let source = ForecastSource::new(table, tracked_unit);
        let log = DecisionLog::create(path, source.schema())?;
        Ok(Self::new(Box::new(source), Some(policy), log))
    }

    /// Reactive loop on fleet-wide utilization, logging to `path`.
    pub fn reactive(policy: ScalingPolicy, path: &Path) -> ControlResult<Self> {
        let source = ReactiveSource::new(policy.config().high_threshold);
        let log = DecisionLog::create(path, source.schema())?;
        Ok(Self::new(Box::new(source), Some(policy), log))
    }

    /// Static baseline: logs the fleet size every tick and never scales.
    pub fn baseline(tracked_unit: i64, path: &Path) -> ControlResult<Self> {
        let source = StaticSource::new(tracked_unit);
        let log = DecisionLog::create(path, source.schema())?;
        Ok(Self::new(Box::new(source), None, log))
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Process one tick. Fails with [`ControlError::Stopped`] once the
    /// loop has stopped.
    pub fn step<F>(&mut self, time: f64, fleet: &mut F) -> ControlResult<DecisionRecord>
    where
        F: FleetManager,
    {
        if self.state == LoopState::Stopped {
            return Err(ControlError::Stopped);
        }

        let slot = time.max(0.0) as u64;
        let sample = self.source.sample(slot, &*fleet);
        let current = fleet.size();
        let target = match &self.policy {
            Some(policy) => policy.decide(sample.signal, current),
            None => current,
        };

        let record = DecisionRecord {
            time,
            slot,
            subject: sample.subject,
            signal_value: sample.signal.map(|s| s.value),
            fleet_size: current,
        };
        self.log.append(&record)?;

        debug!(
            time,
            slot,
            subject = %record.subject,
            signal = ?record.signal_value,
            from = current,
            to = target,
            "tick"
        );

        if self.summary.ticks == 0 {
            self.summary.peak_size = current;
        }
        self.summary.ticks += 1;
        if sample.signal.is_none() {
            self.summary.missing_signals += 1;
        }

        self.apply(fleet, current, target);

        let size = fleet.size();
        self.summary.final_size = size;
        self.summary.peak_size = self.summary.peak_size.max(size);
        Ok(record)
    }

    fn apply<F: FleetManager>(&mut self, fleet: &mut F, current: u32, target: u32) {
        if target > current {
            let added = fleet.add_units(target - current);
            self.summary.scale_ups += 1;
            self.summary.units_added += added.len() as u32;
            info!(from = current, to = target, added = added.len(), "scaled up");
        } else if target < current {
            // LIFO: newest units go first.
            let victims: Vec<UnitId> = fleet
                .units()
                .into_iter()
                .rev()
                .take((current - target) as usize)
                .collect();

            let mut removed = 0;
            for unit in victims {
                if fleet.remove_unit(unit) {
                    removed += 1;
                } else {
                    debug!(%unit, "unit already detached");
                }
            }
            self.summary.scale_downs += 1;
            self.summary.units_removed += removed;
            info!(from = current, to = target, removed, "scaled down");
        }
    }

    /// Drive the loop from `clock` until it ends or `shutdown` flips to
    /// `true`. A tick in progress always completes; the log is flushed
    /// and the loop is stopped before returning.
    pub fn run<C, F>(
        &mut self,
        clock: &mut C,
        fleet: &mut F,
        shutdown: &watch::Receiver<bool>,
    ) -> ControlResult<RunSummary>
    where
        C: Clock<F>,
        F: FleetManager,
    {
        info!(
            schema = ?self.log.schema(),
            policy = self.policy.is_some(),
            "control loop armed"
        );

        while self.state == LoopState::Armed {
            if *shutdown.borrow() {
                info!("shutdown requested, not accepting further ticks");
                break;
            }
            let Some(time) = clock.next_tick(fleet) else {
                break;
            };
            if let Err(e) = self.step(time, fleet) {
                warn!(error = %e, time, "tick failed, stopping control loop");
                self.state = LoopState::Stopped;
                return Err(e);
            }
        }

        self.stop()?;
        Ok(self.summary.clone())
    }

    /// Stop the loop and flush the log. Stopping twice is a no-op.
    pub fn stop(&mut self) -> ControlResult<()> {
        if self.state == LoopState::Stopped {
            return Ok(());
        }
        self.state = LoopState::Stopped;
        self.log.flush()?;
        info!(
            ticks = self.summary.ticks,
            rows = self.log.rows(),
            scale_ups = self.summary.scale_ups,
            scale_downs = self.summary.scale_downs,
            final_size = self.summary.final_size,
            "control loop stopped"
        );
        Ok(())
    }
}
