//! Reference datacenter — hosts, VMs and a queue of workload units.
//!
//! Time only moves through [`Datacenter::advance_to`]. Each placed VM runs
//! up to `vm_pes / workload_pes` units at once; every running unit makes
//! `mips × Δt` progress per advance. Finished units free their slot and
//! the oldest VMs pull waiting units first.

use std::collections::VecDeque;

use tracing::{debug, info};

use vmscale_core::config::SimulationSection;

use crate::fleet::{FleetManager, UnitId};

/// Remaining work below this is treated as done.
const DONE_EPSILON: f64 = 1e-9;

/// Static parameters of the datacenter.
#[derive(Debug, Clone, PartialEq)]
pub struct DatacenterConfig {
    pub hosts: u32,
    pub pes_per_host: u32,
    pub mips: f64,
    pub vm_pes: u32,
    pub workload_length: f64,
    pub workload_pes: u32,
}

impl Default for DatacenterConfig {
    fn default() -> Self {
        Self::from(&SimulationSection::default())
    }
}

impl From<&SimulationSection> for DatacenterConfig {
    fn from(sim: &SimulationSection) -> Self {
        Self {
            hosts: sim.hosts,
            pes_per_host: sim.pes_per_host,
            mips: sim.mips,
            vm_pes: sim.vm_pes,
            workload_length: sim.workload_length,
            workload_pes: sim.workload_pes,
        }
    }
}

impl DatacenterConfig {
    /// Workload units a single VM can run concurrently.
    fn slots_per_vm(&self) -> usize {
        (self.vm_pes / self.workload_pes.max(1)).max(1) as usize
    }
}

#[derive(Debug)]
struct Host {
    free_pes: u32,
}

#[derive(Debug)]
struct Job {
    id: u32,
    remaining: f64,
}

#[derive(Debug)]
struct Vm {
    id: UnitId,
    /// Index into `hosts`; `None` when no host had room.
    host: Option<usize>,
    running: Vec<Job>,
}

/// A simulated datacenter that implements [`FleetManager`].
#[derive(Debug)]
pub struct Datacenter {
    config: DatacenterConfig,
    hosts: Vec<Host>,
    /// Oldest first.
    vms: Vec<Vm>,
    queue: VecDeque<Job>,
    next_vm_id: u64,
    now: f64,
    completed: u32,
}

impl Datacenter {
    /// Create a datacenter with `initial_vms` VMs and `workload_units`
    /// queued units. Units are dispatched to free VM slots right away.
    pub fn new(config: DatacenterConfig, initial_vms: u32, workload_units: u32) -> Self {
        let hosts = (0..config.hosts)
            .map(|_| Host {
                free_pes: config.pes_per_host,
            })
            .collect();
        let queue = (0..workload_units)
            .map(|id| Job {
                id,
                remaining: config.workload_length,
            })
            .collect();

        let mut dc = Self {
            config,
            hosts,
            vms: Vec::new(),
            queue,
            next_vm_id: 1,
            now: 0.0,
            completed: 0,
        };
        dc.add_units(initial_vms);
        dc.dispatch();

        info!(
            hosts = dc.hosts.len(),
            vms = dc.vms.len(),
            workload_units,
            "datacenter created"
        );
        dc
    }

    /// Current simulation time.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Workload units finished so far.
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Workload units waiting for a VM slot.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether every workload unit has finished.
    pub fn workload_finished(&self) -> bool {
        self.queue.is_empty() && self.vms.iter().all(|vm| vm.running.is_empty())
    }

    /// Whether the unit is placed on a host.
    pub fn is_placed(&self, unit: UnitId) -> bool {
        self.vms
            .iter()
            .any(|vm| vm.id == unit && vm.host.is_some())
    }

    /// Run the workload forward to `time`. Earlier times are ignored.
    pub fn advance_to(&mut self, time: f64) {
        if time <= self.now {
            return;
        }
        let progress = self.config.mips * (time - self.now);

        let mut finished = 0;
        for vm in self.vms.iter_mut().filter(|vm| vm.host.is_some()) {
            let vm_id = vm.id;
            vm.running.retain_mut(|job| {
                job.remaining -= progress;
                if job.remaining > DONE_EPSILON {
                    true
                } else {
                    debug!(job = job.id, vm = %vm_id, time, "workload unit finished");
                    finished += 1;
                    false
                }
            });
        }
        self.completed += finished;
        self.now = time;
        self.dispatch();
    }

    /// Move queued units into free slots, oldest VM first.
    fn dispatch(&mut self) {
        let slots = self.config.slots_per_vm();
        for vm in self.vms.iter_mut().filter(|vm| vm.host.is_some()) {
            while vm.running.len() < slots {
                match self.queue.pop_front() {
                    Some(job) => vm.running.push(job),
                    None => return,
                }
            }
        }
    }

    /// Host with the most free PEs that can fit a VM; lowest index on ties.
    fn pick_host(&self) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for (idx, host) in self.hosts.iter().enumerate() {
            if host.free_pes < self.config.vm_pes {
                continue;
            }
            if best.is_none_or(|(_, free)| host.free_pes > free) {
                best = Some((idx, host.free_pes));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

impl FleetManager for Datacenter {
    fn size(&self) -> u32 {
        self.vms.len() as u32
    }

    fn units(&self) -> Vec<UnitId> {
        self.vms.iter().map(|vm| vm.id).collect()
    }

    fn utilization(&self, unit: UnitId) -> f64 {
        let Some(vm) = self.vms.iter().find(|vm| vm.id == unit) else {
            return 0.0;
        };
        if vm.host.is_none() {
            return 0.0;
        }
        let busy = vm.running.len() as u32 * self.config.workload_pes;
        (busy as f64 / self.config.vm_pes as f64).min(1.0)
    }

    fn add_units(&mut self, count: u32) -> Vec<UnitId> {
        let mut added = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = UnitId(self.next_vm_id);
            self.next_vm_id += 1;

            let host = self.pick_host();
            match host {
                Some(idx) => {
                    self.hosts[idx].free_pes -= self.config.vm_pes;
                    debug!(vm = %id, host = idx, "vm placed");
                }
                None => debug!(vm = %id, "no host capacity, vm left unplaced"),
            }

            self.vms.push(Vm {
                id,
                host,
                running: Vec::new(),
            });
            added.push(id);
        }
        added
    }

    fn remove_unit(&mut self, unit: UnitId) -> bool {
        let Some(pos) = self.vms.iter().position(|vm| vm.id == unit) else {
            return false;
        };
        let vm = self.vms.remove(pos);

        if let Some(idx) = vm.host {
            self.hosts[idx].free_pes += self.config.vm_pes;
        }

        let requeued = vm.running.len();
        for job in vm.running.into_iter().rev() {
            self.queue.push_front(job);
        }

        debug!(vm = %unit, placed = vm.host.is_some(), requeued, "vm removed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(vms: u32, units: u32) -> Datacenter {
        Datacenter::new(DatacenterConfig::default(), vms, units)
    }

    #[test]
    fn initial_vms_spread_across_hosts() {
        let dc = dc(2, 20);
        let units = dc.units();
        assert_eq!(units, vec![UnitId(1), UnitId(2)]);
        assert_eq!(dc.hosts[0].free_pes, 2);
        assert_eq!(dc.hosts[1].free_pes, 2);
        assert_eq!(dc.utilization(UnitId(1)), 1.0);
        assert_eq!(dc.utilization(UnitId(2)), 1.0);
        assert_eq!(dc.pending(), 18);
    }

    #[test]
    fn vms_beyond_capacity_stay_unplaced() {
        let mut dc = dc(2, 20);
        let added = dc.add_units(3);
        assert_eq!(added, vec![UnitId(3), UnitId(4), UnitId(5)]);
        assert_eq!(dc.size(), 5);
        assert!(dc.is_placed(UnitId(4)));
        assert!(!dc.is_placed(UnitId(5)));
        assert_eq!(dc.utilization(UnitId(5)), 0.0);
    }

    #[test]
    fn new_vms_pick_up_work_on_next_advance() {
        let mut dc = dc(2, 20);
        dc.add_units(1);
        assert_eq!(dc.utilization(UnitId(3)), 0.0);

        dc.advance_to(1.0);
        assert_eq!(dc.utilization(UnitId(3)), 1.0);
    }

    #[test]
    fn removing_unplaced_vm_is_a_noop_on_hosts() {
        let mut dc = dc(4, 20);
        dc.add_units(1);
        let before: Vec<u32> = dc.hosts.iter().map(|h| h.free_pes).collect();

        assert!(dc.remove_unit(UnitId(5)));
        let after: Vec<u32> = dc.hosts.iter().map(|h| h.free_pes).collect();
        assert_eq!(before, after);
        assert_eq!(dc.size(), 4);
    }

    #[test]
    fn removing_twice_is_safe() {
        let mut dc = dc(2, 20);
        assert!(dc.remove_unit(UnitId(2)));
        assert!(!dc.remove_unit(UnitId(2)));
        assert!(!dc.remove_unit(UnitId(99)));
        assert_eq!(dc.size(), 1);
    }

    #[test]
    fn removing_busy_vm_requeues_its_work() {
        let mut dc = dc(2, 20);
        dc.advance_to(4.0);
        assert!(dc.remove_unit(UnitId(2)));
        assert_eq!(dc.pending(), 19);
        assert_eq!(dc.hosts[1].free_pes, 4);

        // The requeued unit keeps its progress and runs next.
        dc.add_units(1);
        dc.advance_to(5.0);
        dc.advance_to(11.0);
        assert_eq!(dc.completed(), 2);
    }

    #[test]
    fn workload_drains_in_expected_time() {
        let mut dc = dc(2, 20);
        for t in 1..100 {
            dc.advance_to(t as f64);
            assert!(!dc.workload_finished(), "finished early at {t}");
        }
        dc.advance_to(100.0);
        assert!(dc.workload_finished());
        assert_eq!(dc.completed(), 20);
        assert_eq!(dc.utilization(UnitId(1)), 0.0);
    }

    #[test]
    fn advancing_backwards_is_ignored() {
        let mut dc = dc(1, 1);
        dc.advance_to(5.0);
        dc.advance_to(2.0);
        assert_eq!(dc.now(), 5.0);
    }

    #[test]
    fn unknown_unit_has_zero_utilization() {
        assert_eq!(dc(1, 1).utilization(UnitId(42)), 0.0);
    }
}
