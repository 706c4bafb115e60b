//! vmscale-sim — the world the control loop acts on.
//!
//! The control loop only sees two interfaces:
//!
//! - [`FleetManager`]: the ordered set of running VMs, their utilization,
//!   and add/remove operations.
//! - [`Clock`]: a monotonically increasing sequence of tick times followed
//!   by an end-of-simulation signal.
//!
//! [`Datacenter`] and [`SimClock`] are a small reference implementation of
//! both, used by the `vmscale` binary:
//!
//! ```text
//! Datacenter
//!   ├── hosts (PE capacity, VMs placed on the host with most free PEs)
//!   ├── vms   (oldest first; unplaced VMs are never scheduled)
//!   └── queue (workload units waiting for a free VM slot)
//! ```

pub mod clock;
pub mod datacenter;
pub mod fleet;

pub use clock::{Clock, SimClock, TickSchedule};
pub use datacenter::{Datacenter, DatacenterConfig};
pub use fleet::{FleetManager, UnitId};
