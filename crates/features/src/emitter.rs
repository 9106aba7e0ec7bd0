//! Feature/label extraction from slot windows.
//!
//! The last bucket of a window is the label slot; every other bucket is a
//! feature row. The label is the direction of the estimate instrument's bid
//! close between the last two buckets.

use timeslot_core::{Bucket, Error, FeatureLabelRecord, FeatureMode, Result, SlotStats};

/// Turns windows of buckets into feature/label records.
#[derive(Debug, Clone)]
pub struct FeatureLabelEmitter {
    estimate_instrument: String,
    mode: FeatureMode,
}

impl FeatureLabelEmitter {
    /// Create a new emitter.
    pub fn new(estimate_instrument: impl Into<String>, mode: FeatureMode) -> Self {
        Self {
            estimate_instrument: estimate_instrument.into(),
            mode,
        }
    }

    /// Build the record for one window, ordered oldest first.
    pub fn emit(&self, window: &[&Bucket]) -> Result<FeatureLabelRecord> {
        let (label_row, feature_rows) = window.split_last().ok_or_else(|| {
            Error::insufficient_data("empty window")
        })?;
        let prev_row = feature_rows.last().ok_or_else(|| {
            Error::insufficient_data("window needs at least two buckets")
        })?;

        let features = match self.mode {
            FeatureMode::SpreadDelta => spread_delta_features(feature_rows),
            FeatureMode::RawFields => raw_field_features(feature_rows),
        };
        let label = self.label(prev_row, label_row)?;
        Ok(FeatureLabelRecord::new(features, label))
    }

    /// 1 when the estimate instrument's bid close rose from `prev` to `current`.
    pub fn label(&self, prev: &Bucket, current: &Bucket) -> Result<u8> {
        let prev_close = self.estimate_stats(prev)?.bid_close;
        let close = self.estimate_stats(current)?.bid_close;
        Ok(u8::from(close > prev_close))
    }

    fn estimate_stats<'a>(&self, bucket: &'a Bucket) -> Result<&'a SlotStats> {
        bucket.get(&self.estimate_instrument).ok_or_else(|| {
            Error::missing_data(format!(
                "estimate instrument {} absent from slot",
                self.estimate_instrument
            ))
        })
    }
}

/// Close spread per instrument per row, plus the bid close change from the
/// previous row after the first. Only instruments present in every row count.
fn spread_delta_features(rows: &[&Bucket]) -> Vec<f64> {
    let common: Vec<&String> = match rows.first() {
        Some(first) => first
            .keys()
            .filter(|symbol| rows.iter().all(|row| row.contains_key(*symbol)))
            .collect(),
        None => return Vec::new(),
    };

    let mut features = Vec::with_capacity(common.len() * (2 * rows.len()).saturating_sub(1));
    for (i, row) in rows.iter().enumerate() {
        for symbol in &common {
            let stats = &row[*symbol];
            features.push(stats.close_spread());
            if i > 0 {
                let prev = &rows[i - 1][*symbol];
                features.push(stats.bid_close - prev.bid_close);
            }
        }
    }
    features
}

/// Every statistic of every instrument, row by row.
fn raw_field_features(rows: &[&Bucket]) -> Vec<f64> {
    rows.iter()
        .flat_map(|row| row.values())
        .flat_map(|stats| stats.fields())
        .collect()
}
