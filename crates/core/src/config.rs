//! Configuration structures for the timeslot pipeline.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Currency pairs tracked when no explicit list is configured.
pub const DEFAULT_INSTRUMENTS: [&str; 15] = [
    "AUDJPY", "AUDNZD", "AUDUSD", "CADJPY", "CHFJPY", "EURCHF", "EURGBP", "EURJPY", "EURUSD",
    "GBPJPY", "GBPUSD", "NZDUSD", "USDCAD", "USDCHF", "USDJPY",
];

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input dataset configuration.
    pub dataset: DatasetConfig,
    /// Slot aggregation configuration.
    pub aggregation: AggregationConfig,
    /// Feature and label configuration.
    pub features: FeatureConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing sections take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Check that the configuration describes a runnable pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.aggregation.slot_minutes == 0 {
            return Err(Error::config("slot_minutes must be positive"));
        }
        if self.features.window_size == 0 {
            return Err(Error::config("window_size must be at least 1"));
        }
        if self.dataset.tracked_instruments.is_empty() {
            return Err(Error::config("no tracked instruments"));
        }
        if !self.dataset.is_tracked(&self.features.estimate_instrument) {
            return Err(Error::config(format!(
                "estimate instrument {} is not tracked",
                self.features.estimate_instrument
            )));
        }
        Ok(())
    }

    /// Number of consecutive slots in one window (features plus label slot).
    pub fn sequence_len(&self) -> usize {
        self.features.window_size + 1
    }
}

/// Input dataset configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Instruments whose archives are aggregated; others are skipped.
    pub tracked_instruments: Vec<String>,
}

impl DatasetConfig {
    /// Whether archives of the given symbol take part in the run.
    pub fn is_tracked(&self, symbol: &str) -> bool {
        self.tracked_instruments.iter().any(|s| s == symbol)
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            tracked_instruments: DEFAULT_INSTRUMENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Slot aggregation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Slot length in minutes.
    pub slot_minutes: u32,
    /// What happens to slots without ticks.
    pub empty_slot_policy: EmptySlotPolicy,
    /// Where the first slot starts.
    pub anchor: SlotAnchor,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            slot_minutes: 60,
            empty_slot_policy: EmptySlotPolicy::Exclude,
            anchor: SlotAnchor::MonthStart,
        }
    }
}

/// Feature and label configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Instrument whose bid direction becomes the label.
    pub estimate_instrument: String,
    /// Number of feature slots per window.
    pub window_size: usize,
    /// How slots are flattened into features.
    pub mode: FeatureMode,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            estimate_instrument: "EURUSD".to_string(),
            window_size: 3,
            mode: FeatureMode::SpreadDelta,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Dataset file, truncated at the start of a run.
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output"),
        }
    }
}

/// Treatment of slots in which an instrument has no ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptySlotPolicy {
    /// Drop the slot boundary for every instrument in the period.
    Exclude,
    /// Reuse the instrument's previous slot statistics.
    CarryForward,
}

/// Start of the first slot of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotAnchor {
    /// Midnight on the first day of the first tick's month.
    MonthStart,
    /// The first tick's own timestamp.
    FirstTick,
}

/// Flattening of feature slots into a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureMode {
    /// Close spread per instrument, plus bid close delta after the first row.
    SpreadDelta,
    /// All eight slot statistics per instrument.
    RawFields,
}
