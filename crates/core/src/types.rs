//! Core data types for the timeslot pipeline.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::error::{Error, Result};

/// Slot boundary: the exclusive upper end of a slot.
pub type SlotTime = NaiveDateTime;

/// Instrument symbol (e.g., "EURUSD").
pub type Symbol = String;

/// Midnight on the first day of the timestamp's month.
#[inline]
pub fn month_start(ts: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(ts)
}

/// One bid/ask observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Observation time.
    pub ts: NaiveDateTime,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
}

impl Tick {
    pub fn new(ts: NaiveDateTime, bid: f64, ask: f64) -> Self {
        Self { ts, bid, ask }
    }
}

/// Summary statistics for one instrument over one slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotStats {
    pub bid_max: f64,
    pub bid_min: f64,
    /// Bid of the first tick in the slot.
    pub bid_open: f64,
    /// Bid of the last tick in the slot.
    pub bid_close: f64,
    pub ask_max: f64,
    pub ask_min: f64,
    pub ask_open: f64,
    pub ask_close: f64,
}

impl SlotStats {
    /// Statistics of a single tick.
    pub fn from_tick(tick: &Tick) -> Self {
        Self {
            bid_max: tick.bid,
            bid_min: tick.bid,
            bid_open: tick.bid,
            bid_close: tick.bid,
            ask_max: tick.ask,
            ask_min: tick.ask,
            ask_open: tick.ask,
            ask_close: tick.ask,
        }
    }

    /// Statistics over ticks in arrival order. `None` for an empty slice.
    pub fn from_ticks(ticks: &[Tick]) -> Option<Self> {
        let (first, rest) = ticks.split_first()?;
        let mut stats = Self::from_tick(first);
        for tick in rest {
            stats.update(tick);
        }
        Some(stats)
    }

    /// Fold a later tick into the statistics.
    #[inline]
    pub fn update(&mut self, tick: &Tick) {
        self.bid_max = self.bid_max.max(tick.bid);
        self.bid_min = self.bid_min.min(tick.bid);
        self.bid_close = tick.bid;
        self.ask_max = self.ask_max.max(tick.ask);
        self.ask_min = self.ask_min.min(tick.ask);
        self.ask_close = tick.ask;
    }

    /// Bid minus ask at slot close.
    #[inline]
    pub fn close_spread(&self) -> f64 {
        self.bid_close - self.ask_close
    }

    /// All eight statistics, bid side first: max, min, open, close.
    pub fn fields(&self) -> [f64; 8] {
        [
            self.bid_max,
            self.bid_min,
            self.bid_open,
            self.bid_close,
            self.ask_max,
            self.ask_min,
            self.ask_open,
            self.ask_close,
        ]
    }

    /// Open and close lie within [min, max] on both sides.
    pub fn is_consistent(&self) -> bool {
        let within = |v: f64, lo: f64, hi: f64| lo <= v && v <= hi;
        self.bid_min <= self.bid_max
            && self.ask_min <= self.ask_max
            && within(self.bid_open, self.bid_min, self.bid_max)
            && within(self.bid_close, self.bid_min, self.bid_max)
            && within(self.ask_open, self.ask_min, self.ask_max)
            && within(self.ask_close, self.ask_min, self.ask_max)
    }
}

/// Statistics of every instrument observed in one slot, sorted by symbol.
pub type Bucket = BTreeMap<Symbol, SlotStats>;

/// Time-ordered buckets for one period, all instruments jointly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSeries {
    slots: BTreeMap<SlotTime, Bucket>,
}

impl BucketSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one instrument's statistics for a slot.
    pub fn insert(&mut self, boundary: SlotTime, symbol: &str, stats: SlotStats) {
        self.slots
            .entry(boundary)
            .or_default()
            .insert(symbol.to_string(), stats);
    }

    /// Drop the given boundaries for every instrument. Returns how many were present.
    pub fn remove_boundaries(&mut self, boundaries: &BTreeSet<SlotTime>) -> usize {
        let before = self.slots.len();
        self.slots.retain(|ts, _| !boundaries.contains(ts));
        before - self.slots.len()
    }

    /// Number of slot boundaries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Boundaries in ascending order.
    pub fn boundaries(&self) -> impl Iterator<Item = &SlotTime> {
        self.slots.keys()
    }

    /// Buckets in ascending boundary order.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> + Clone {
        self.slots.values()
    }

    /// Boundaries whose bucket lacks an instrument seen elsewhere in the series.
    pub fn partial_boundaries(&self) -> BTreeSet<SlotTime> {
        let symbols: BTreeSet<&Symbol> = self.slots.values().flat_map(|b| b.keys()).collect();
        self.slots
            .iter()
            .filter(|(_, bucket)| bucket.len() < symbols.len())
            .map(|(ts, _)| *ts)
            .collect()
    }
}

/// One dataset row: flat feature vector plus binary label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLabelRecord {
    pub features: Vec<f64>,
    /// 1 when the estimate instrument's bid closed higher, else 0.
    pub label: u8,
}

impl FeatureLabelRecord {
    pub fn new(features: Vec<f64>, label: u8) -> Self {
        Self { features, label }
    }

    /// Text form: each feature with six decimals and a trailing space, then the label.
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(self.features.len() * 10 + 2);
        for feature in &self.features {
            let _ = write!(line, "{:.6} ", feature);
        }
        let _ = write!(line, "{}", self.label);
        line
    }

    /// Parse the text form back. The last token is the label.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        let label_token = tokens
            .pop()
            .ok_or_else(|| Error::parse("empty dataset line"))?;
        let label = match label_token {
            "0" => 0,
            "1" => 1,
            other => return Err(Error::parse(format!("invalid label '{}'", other))),
        };
        let features = tokens
            .iter()
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| Error::parse(format!("invalid feature '{}'", t)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { features, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 3, 2)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_month_start() {
        let start = month_start(ts(9, 30));
        assert_eq!(start, NaiveDate::from_ymd_opt(2015, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_stats_open_close_order() {
        let ticks = [
            Tick::new(ts(9, 0), 1.10, 1.11),
            Tick::new(ts(9, 10), 1.15, 1.16),
            Tick::new(ts(9, 20), 1.08, 1.09),
            Tick::new(ts(9, 30), 1.12, 1.13),
        ];
        let stats = SlotStats::from_ticks(&ticks).unwrap();

        assert_relative_eq!(stats.bid_open, 1.10);
        assert_relative_eq!(stats.bid_close, 1.12);
        assert_relative_eq!(stats.bid_max, 1.15);
        assert_relative_eq!(stats.bid_min, 1.08);
        assert_relative_eq!(stats.ask_open, 1.11);
        assert_relative_eq!(stats.ask_close, 1.13);
        assert!(stats.is_consistent());
        assert_relative_eq!(stats.close_spread(), -0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_stats_empty() {
        assert!(SlotStats::from_ticks(&[]).is_none());
    }

    #[test]
    fn test_series_ordering_and_removal() {
        let stats = SlotStats::from_tick(&Tick::new(ts(9, 0), 1.0, 1.1));
        let mut series = BucketSeries::new();
        series.insert(ts(11, 0), "EURUSD", stats);
        series.insert(ts(10, 0), "USDJPY", stats);
        series.insert(ts(10, 0), "EURUSD", stats);

        let order: Vec<_> = series.boundaries().copied().collect();
        assert_eq!(order, vec![ts(10, 0), ts(11, 0)]);

        let symbols: Vec<_> = series.buckets().next().unwrap().keys().cloned().collect();
        assert_eq!(symbols, vec!["EURUSD", "USDJPY"]);

        let removed = series.remove_boundaries(&[ts(11, 0), ts(12, 0)].into_iter().collect());
        assert_eq!(removed, 1);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_partial_boundaries() {
        let stats = SlotStats::from_tick(&Tick::new(ts(9, 0), 1.0, 1.1));
        let mut series = BucketSeries::new();
        series.insert(ts(10, 0), "EURUSD", stats);
        series.insert(ts(10, 0), "GBPUSD", stats);
        series.insert(ts(11, 0), "GBPUSD", stats);
        series.insert(ts(12, 0), "EURUSD", stats);
        series.insert(ts(12, 0), "GBPUSD", stats);

        let partial: Vec<_> = series.partial_boundaries().into_iter().collect();
        assert_eq!(partial, vec![ts(11, 0)]);
        assert!(BucketSeries::new().partial_boundaries().is_empty());
    }

    #[test]
    fn test_record_line_format() {
        let record = FeatureLabelRecord::new(vec![-0.0001, 0.02], 1);
        assert_eq!(record.to_line(), "-0.000100 0.020000 1");

        let parsed = FeatureLabelRecord::parse_line("-0.000100 0.020000 1").unwrap();
        assert_eq!(parsed.label, 1);
        assert_relative_eq!(parsed.features[0], -0.0001);
    }

    #[test]
    fn test_record_parse_rejects_bad_label() {
        assert!(FeatureLabelRecord::parse_line("0.1 0.2 2").is_err());
        assert!(FeatureLabelRecord::parse_line("   ").is_err());
        assert!(FeatureLabelRecord::parse_line("abc 0").is_err());
    }
}
