//! Run summary counters.

use serde::{Deserialize, Serialize};

/// Counters collected over a run (or a single period).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Periods processed.
    pub periods: u32,
    /// Archives aggregated.
    pub archives: u32,
    /// Ticks read.
    pub ticks: u64,
    /// Slot boundaries kept after exclusion.
    pub slots: u64,
    /// Slot boundaries dropped as incomplete.
    pub excluded_slots: u64,
    /// Windows turned into records.
    pub windows: u64,
    /// Records labelled 1.
    pub positive_labels: u64,
}

impl RunSummary {
    /// Fraction of records labelled 1.
    pub fn positive_ratio(&self) -> f64 {
        if self.windows > 0 {
            self.positive_labels as f64 / self.windows as f64
        } else {
            0.0
        }
    }

    /// Add another summary's counters.
    pub fn merge(&mut self, other: &RunSummary) {
        self.periods += other.periods;
        self.archives += other.archives;
        self.ticks += other.ticks;
        self.slots += other.slots;
        self.excluded_slots += other.excluded_slots;
        self.windows += other.windows;
        self.positive_labels += other.positive_labels;
    }
}
