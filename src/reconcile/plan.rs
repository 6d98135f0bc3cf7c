use std::collections::HashSet;
use std::fmt;

use crate::health::HealthStatus;

/// Changes needed to move the RIB from `current` to the desired routes
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub to_add: Vec<String>,
    pub to_delete: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "+{:?} -{:?}", self.to_add, self.to_delete)
    }
}

/// Routes to advertise after the health gate: nothing when unhealthy
pub fn effective<'a>(desired: &'a [String], health: HealthStatus) -> &'a [String] {
    if health.is_healthy() {
        desired
    } else {
        &[]
    }
}

/// Diff two prefix lists by exact string membership
///
/// `to_add` keeps the order of `desired`, `to_delete` the order of `current`.
pub fn plan(desired: &[String], health: HealthStatus, current: &[String]) -> Plan {
    let effective = effective(desired, health);
    let wanted: HashSet<&str> = effective.iter().map(String::as_str).collect();
    let existing: HashSet<&str> = current.iter().map(String::as_str).collect();
    Plan {
        to_add: effective
            .iter()
            .filter(|p| !existing.contains(p.as_str()))
            .cloned()
            .collect(),
        to_delete: current
            .iter()
            .filter(|p| !wanted.contains(p.as_str()))
            .cloned()
            .collect(),
    }
}
