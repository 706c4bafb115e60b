//! Tick sources for the control loop.

use std::collections::VecDeque;

use tracing::info;

use crate::datacenter::Datacenter;

/// Delivers tick times in increasing order, then `None` once the
/// simulation has ended.
///
/// The clock gets mutable access to the fleet so a simulator can advance
/// the world before the tick is handed to the control loop.
pub trait Clock<F: ?Sized> {
    fn next_tick(&mut self, fleet: &mut F) -> Option<f64>;
}

/// Fixed-interval clock driving a [`Datacenter`].
///
/// The first tick fires at `0.0`. The clock ends when the workload has
/// drained or the next tick would pass `max_time`.
#[derive(Debug, Clone)]
pub struct SimClock {
    interval: f64,
    max_time: f64,
    ticks: u64,
    ended: bool,
}

impl SimClock {
    pub fn new(interval: f64, max_time: f64) -> Self {
        Self {
            interval,
            max_time,
            ticks: 0,
            ended: false,
        }
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn end(&mut self, time: f64, reason: &str) -> Option<f64> {
        self.ended = true;
        info!(time, ticks = self.ticks, reason, "simulation ended");
        None
    }
}

impl Clock<Datacenter> for SimClock {
    fn next_tick(&mut self, dc: &mut Datacenter) -> Option<f64> {
        if self.ended {
            return None;
        }

        let time = self.ticks as f64 * self.interval;
        if time > self.max_time {
            return self.end(dc.now(), "time limit reached");
        }

        dc.advance_to(time);
        if dc.workload_finished() {
            return self.end(time, "workload drained");
        }

        self.ticks += 1;
        Some(time)
    }
}

/// A scripted list of tick times. Ignores the fleet entirely.
#[derive(Debug, Clone, Default)]
pub struct TickSchedule {
    times: VecDeque<f64>,
}

impl TickSchedule {
    pub fn new(times: impl IntoIterator<Item = f64>) -> Self {
        Self {
            times: times.into_iter().collect(),
        }
    }

    /// `count` ticks at `0, 1, 2, …`.
    pub fn every_second(count: u32) -> Self {
        Self::new((0..count).map(f64::from))
    }
}

impl<F: ?Sized> Clock<F> for TickSchedule {
    fn next_tick(&mut self, _fleet: &mut F) -> Option<f64> {
        self.times.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datacenter::DatacenterConfig;

    #[test]
    fn sim_clock_starts_at_zero_and_steps() {
        let mut dc = Datacenter::new(DatacenterConfig::default(), 2, 20);
        let mut clock = SimClock::new(0.5, 100.0);

        assert_eq!(clock.next_tick(&mut dc), Some(0.0));
        assert_eq!(clock.next_tick(&mut dc), Some(0.5));
        assert_eq!(clock.next_tick(&mut dc), Some(1.0));
        assert_eq!(dc.now(), 1.0);
        assert_eq!(clock.ticks(), 3);
    }

    #[test]
    fn sim_clock_ends_when_workload_drains() {
        let mut dc = Datacenter::new(DatacenterConfig::default(), 2, 2);
        let mut clock = SimClock::new(1.0, 1_000.0);

        let mut last = None;
        while let Some(t) = clock.next_tick(&mut dc) {
            last = Some(t);
        }
        // Two units of 10s on two VMs finish at t=10.
        assert_eq!(last, Some(9.0));
        assert!(dc.workload_finished());
        assert_eq!(clock.next_tick(&mut dc), None);
    }

    #[test]
    fn sim_clock_respects_time_limit() {
        let mut dc = Datacenter::new(DatacenterConfig::default(), 1, 20);
        let mut clock = SimClock::new(1.0, 3.0);

        let ticks: Vec<f64> = std::iter::from_fn(|| clock.next_tick(&mut dc)).collect();
        assert_eq!(ticks, vec![0.0, 1.0, 2.0, 3.0]);
        assert!(!dc.workload_finished());
    }

    #[test]
    fn schedule_replays_times() {
        let mut schedule = TickSchedule::every_second(3);
        let mut fleet = ();
        assert_eq!(schedule.next_tick(&mut fleet), Some(0.0));
        assert_eq!(schedule.next_tick(&mut fleet), Some(1.0));
        assert_eq!(schedule.next_tick(&mut fleet), Some(2.0));
        assert_eq!(schedule.next_tick(&mut fleet), None);
    }
}
