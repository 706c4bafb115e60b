//! Fleet manager interface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle of one fleet member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vm-{}", self.0)
    }
}

/// The set of running worker units managed by scaling decisions.
///
/// Units are kept in the order they were added. Implementations own
/// provisioning; a unit returned by `add_units` is part of the fleet
/// immediately but may not carry load until the simulator advances.
pub trait FleetManager {
    /// Number of units currently in the fleet.
    fn size(&self) -> u32;

    /// All units, oldest first.
    fn units(&self) -> Vec<UnitId>;

    /// CPU utilization of a unit as a fraction in `[0, 1]`.
    ///
    /// Units that are unknown or not placed on a host report `0.0`.
    fn utilization(&self, unit: UnitId) -> f64;

    /// Provision `count` new units and return their handles.
    fn add_units(&mut self, count: u32) -> Vec<UnitId>;

    /// Detach a unit from the fleet.
    ///
    /// Returns `false` when the unit was already detached. This is never
    /// an error.
    fn remove_unit(&mut self, unit: UnitId) -> bool;
}
