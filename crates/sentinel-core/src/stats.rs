//! Diagnostic counters for one trigger.

use std::cell::Cell;

use serde::Serialize;

/// Counters shared by the watchers of one trigger.
#[derive(Debug, Default)]
pub struct TriggerStats {
    installs: Cell<u64>,
    intersection_batches: Cell<u64>,
    notifications: Cell<u64>,
    mutation_batches: Cell<u64>,
    failed_rearms: Cell<u64>,
}

fn bump(cell: &Cell<u64>, by: u64) {
    cell.set(cell.get().saturating_add(by));
}

impl TriggerStats {
    pub(crate) fn record_install(&self) {
        bump(&self.installs, 1);
    }

    pub(crate) fn record_intersection_batch(&self, notified: usize) {
        bump(&self.intersection_batches, 1);
        bump(&self.notifications, notified as u64);
    }

    pub(crate) fn record_mutation_batch(&self) {
        bump(&self.mutation_batches, 1);
    }

    pub(crate) fn record_failed_rearm(&self) {
        bump(&self.failed_rearms, 1);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            installs: self.installs.get(),
            intersection_batches: self.intersection_batches.get(),
            notifications: self.notifications.get(),
            mutation_batches: self.mutation_batches.get(),
            failed_rearms: self.failed_rearms.get(),
        }
    }
}

/// Point-in-time copy of [`TriggerStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub installs: u64,
    pub intersection_batches: u64,
    pub notifications: u64,
    pub mutation_batches: u64,
    pub failed_rearms: u64,
}

impl StatsSnapshot {
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
