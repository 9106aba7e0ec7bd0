//! Fixed-length slot building from ticks.
//!
//! Aggregates one instrument's ticks into per-slot bid/ask statistics.
//! Slots are keyed by their exclusive upper boundary.

use chrono::{Duration, NaiveDateTime};
use std::collections::BTreeSet;
use timeslot_core::{
    month_start, BucketSeries, EmptySlotPolicy, Error, Result, SlotAnchor, SlotStats, SlotTime,
    Symbol, Tick,
};
use tracing::trace;

/// Aggregation output for one instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotAggregate {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Closed slots in ascending boundary order.
    pub slots: Vec<(SlotTime, SlotStats)>,
    /// Boundaries of slots without usable statistics.
    pub incomplete: BTreeSet<SlotTime>,
}

impl SlotAggregate {
    /// Move the slots into a series and the incomplete boundaries into `incomplete`.
    pub fn merge_into(self, series: &mut BucketSeries, incomplete: &mut BTreeSet<SlotTime>) {
        for (boundary, stats) in self.slots {
            series.insert(boundary, &self.symbol, stats);
        }
        incomplete.extend(self.incomplete);
    }

    /// Latest boundary accounted for, populated or incomplete.
    pub fn last_boundary(&self) -> Option<SlotTime> {
        let populated = self.slots.last().map(|(b, _)| *b);
        let missing = self.incomplete.iter().next_back().copied();
        populated.max(missing)
    }

    /// Account for the slots after this instrument's last tick, up to and
    /// including `through` (the period's final boundary).
    pub fn extend_through(
        &mut self,
        through: SlotTime,
        slot_minutes: u32,
        policy: EmptySlotPolicy,
    ) {
        let Some(mut boundary) = self.last_boundary() else {
            return;
        };
        let slot_len = Duration::minutes(i64::from(slot_minutes));
        let carried = match policy {
            EmptySlotPolicy::CarryForward => self.slots.last().map(|(_, stats)| *stats),
            EmptySlotPolicy::Exclude => None,
        };

        boundary += slot_len;
        while boundary <= through {
            match carried {
                Some(stats) => self.slots.push((boundary, stats)),
                None => {
                    self.incomplete.insert(boundary);
                }
            }
            boundary += slot_len;
        }
    }
}

/// Slot currently collecting ticks.
#[derive(Debug, Clone)]
struct SlotInProgress {
    upper: SlotTime,
    stats: Option<SlotStats>,
    tick_count: u32,
}

impl SlotInProgress {
    fn new(upper: SlotTime) -> Self {
        Self {
            upper,
            stats: None,
            tick_count: 0,
        }
    }

    fn add_tick(&mut self, tick: &Tick) {
        match self.stats.as_mut() {
            Some(stats) => stats.update(tick),
            None => self.stats = Some(SlotStats::from_tick(tick)),
        }
        self.tick_count += 1;
    }
}

/// Builder for fixed-length slots from one instrument's chronological ticks.
pub struct SlotBuilder {
    symbol: Symbol,
    slot_len: Duration,
    policy: EmptySlotPolicy,
    anchor: SlotAnchor,
    /// Open slot, `None` until the first tick arrives.
    current: Option<SlotInProgress>,
    /// Most recent statistics, used for carry-forward.
    last_stats: Option<SlotStats>,
    last_ts: Option<NaiveDateTime>,
    tick_count: u64,
    aggregate: SlotAggregate,
}

impl SlotBuilder {
    /// Create a new slot builder.
    pub fn new(
        symbol: impl Into<Symbol>,
        slot_minutes: u32,
        policy: EmptySlotPolicy,
        anchor: SlotAnchor,
    ) -> Self {
        let symbol = symbol.into();
        Self {
            aggregate: SlotAggregate {
                symbol: symbol.clone(),
                ..SlotAggregate::default()
            },
            symbol,
            slot_len: Duration::minutes(i64::from(slot_minutes)),
            policy,
            anchor,
            current: None,
            last_stats: None,
            last_ts: None,
            tick_count: 0,
        }
    }

    /// Add a tick. Ticks must arrive in chronological order.
    pub fn add_tick(&mut self, tick: &Tick) -> Result<()> {
        if let Some(last) = self.last_ts {
            if tick.ts < last {
                return Err(Error::data(format!(
                    "{}: tick at {} precedes previous tick at {}",
                    self.symbol, tick.ts, last
                )));
            }
        }
        self.last_ts = Some(tick.ts);
        self.tick_count += 1;

        if self.current.is_none() {
            let start = match self.anchor {
                SlotAnchor::MonthStart => month_start(tick.ts),
                SlotAnchor::FirstTick => tick.ts,
            };
            self.current = Some(SlotInProgress::new(start + self.slot_len));
        }

        // Close every slot the tick has moved past, empty ones included.
        while let Some(slot) = self.current.take() {
            if tick.ts < slot.upper {
                self.current = Some(slot);
                break;
            }
            let next = SlotInProgress::new(slot.upper + self.slot_len);
            self.close_slot(slot);
            self.current = Some(next);
        }

        if let Some(slot) = self.current.as_mut() {
            slot.add_tick(tick);
        }
        Ok(())
    }

    fn close_slot(&mut self, slot: SlotInProgress) {
        match slot.stats {
            Some(stats) => {
                trace!(symbol = %self.symbol, boundary = %slot.upper, ticks = slot.tick_count, "slot closed");
                self.aggregate.slots.push((slot.upper, stats));
                self.last_stats = Some(stats);
            }
            None => match (self.policy, self.last_stats) {
                (EmptySlotPolicy::CarryForward, Some(prev)) => {
                    self.aggregate.slots.push((slot.upper, prev));
                }
                _ => {
                    self.aggregate.incomplete.insert(slot.upper);
                }
            },
        }
    }

    /// Number of ticks consumed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Close the trailing slot (if it holds ticks) and return the aggregate.
    pub fn finish(mut self) -> SlotAggregate {
        if let Some(slot) = self.current.take() {
            if slot.stats.is_some() {
                self.close_slot(slot);
            }
        }
        self.aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2015, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tick(day: u32, h: u32, m: u32, bid: f64, ask: f64) -> Tick {
        Tick::new(at(day, h, m), bid, ask)
    }

    fn hourly(policy: EmptySlotPolicy, anchor: SlotAnchor) -> SlotBuilder {
        SlotBuilder::new("EURUSD", 60, policy, anchor)
    }

    #[test]
    fn test_single_slot_scenario() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::FirstTick);
        builder.add_tick(&tick(5, 9, 0, 1.10, 1.11)).unwrap();
        builder.add_tick(&tick(5, 9, 30, 1.12, 1.13)).unwrap();

        let agg = builder.finish();
        assert_eq!(agg.slots.len(), 1);
        let (boundary, stats) = agg.slots[0];
        assert_eq!(boundary, at(5, 10, 0));
        assert_relative_eq!(stats.bid_open, 1.10);
        assert_relative_eq!(stats.bid_close, 1.12);
        assert_relative_eq!(stats.bid_max, 1.12);
        assert_relative_eq!(stats.bid_min, 1.10);
        assert!(agg.incomplete.is_empty());
    }

    #[test]
    fn test_month_start_anchor_marks_leading_slots() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::MonthStart);
        builder.add_tick(&tick(1, 2, 15, 1.0, 1.1)).unwrap();
        let agg = builder.finish();

        // 00:00-01:00 and 01:00-02:00 are empty, 02:00-03:00 holds the tick.
        assert_eq!(agg.slots.len(), 1);
        assert_eq!(agg.slots[0].0, at(1, 3, 0));
        let incomplete: Vec<_> = agg.incomplete.into_iter().collect();
        assert_eq!(incomplete, vec![at(1, 1, 0), at(1, 2, 0)]);
    }

    #[test]
    fn test_tick_on_boundary_opens_next_slot() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::FirstTick);
        builder.add_tick(&tick(5, 9, 0, 1.10, 1.11)).unwrap();
        builder.add_tick(&tick(5, 10, 0, 1.20, 1.21)).unwrap();
        let agg = builder.finish();

        assert_eq!(agg.slots.len(), 2);
        assert_relative_eq!(agg.slots[0].1.bid_close, 1.10);
        assert_relative_eq!(agg.slots[1].1.bid_open, 1.20);
        assert_eq!(agg.slots[1].0, at(5, 11, 0));
    }

    #[test]
    fn test_gap_excluded() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::FirstTick);
        builder.add_tick(&tick(5, 9, 0, 1.10, 1.11)).unwrap();
        builder.add_tick(&tick(5, 12, 30, 1.20, 1.21)).unwrap();
        let agg = builder.finish();

        let boundaries: Vec<_> = agg.slots.iter().map(|(b, _)| *b).collect();
        assert_eq!(boundaries, vec![at(5, 10, 0), at(5, 13, 0)]);
        let incomplete: Vec<_> = agg.incomplete.into_iter().collect();
        assert_eq!(incomplete, vec![at(5, 11, 0), at(5, 12, 0)]);
    }

    #[test]
    fn test_gap_carried_forward() {
        let mut builder = hourly(EmptySlotPolicy::CarryForward, SlotAnchor::FirstTick);
        builder.add_tick(&tick(5, 9, 0, 1.10, 1.11)).unwrap();
        builder.add_tick(&tick(5, 9, 40, 1.14, 1.15)).unwrap();
        builder.add_tick(&tick(5, 12, 30, 1.20, 1.21)).unwrap();
        let agg = builder.finish();

        assert_eq!(agg.slots.len(), 4);
        assert!(agg.incomplete.is_empty());
        let populated = agg.slots[0].1;
        assert_eq!(agg.slots[1].1, populated);
        assert_eq!(agg.slots[2].1, populated);
        assert_eq!(agg.slots[1].1.fields(), populated.fields());
        assert_relative_eq!(agg.slots[3].1.bid_open, 1.20);
    }

    #[test]
    fn test_carry_forward_without_history_is_incomplete() {
        let mut builder = hourly(EmptySlotPolicy::CarryForward, SlotAnchor::MonthStart);
        builder.add_tick(&tick(1, 1, 30, 1.0, 1.1)).unwrap();
        let agg = builder.finish();

        assert_eq!(agg.slots.len(), 1);
        assert!(agg.incomplete.contains(&at(1, 1, 0)));
    }

    #[test]
    fn test_out_of_order_tick_rejected() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::FirstTick);
        builder.add_tick(&tick(5, 9, 30, 1.10, 1.11)).unwrap();
        let err = builder.add_tick(&tick(5, 9, 0, 1.10, 1.11)).unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }

    #[test]
    fn test_empty_input() {
        let builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::MonthStart);
        let agg = builder.finish();
        assert!(agg.slots.is_empty());
        assert!(agg.incomplete.is_empty());
        assert_eq!(agg.symbol, "EURUSD");
    }

    #[test]
    fn test_stats_consistent() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::FirstTick);
        let prices = [1.3, 1.1, 1.5, 1.2, 1.4, 1.0, 1.6, 1.25];
        for (i, p) in prices.iter().enumerate() {
            builder
                .add_tick(&tick(5, 9 + (i as u32 / 3), (i as u32 % 3) * 15, *p, p + 0.01))
                .unwrap();
        }
        assert_eq!(builder.tick_count(), 8);
        let agg = builder.finish();
        assert_eq!(agg.slots.len(), 3);
        assert!(agg.slots.iter().all(|(_, s)| s.is_consistent()));
    }

    #[test]
    fn test_extend_through_excludes_trailing_slots() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::MonthStart);
        builder.add_tick(&tick(1, 0, 10, 1.10, 1.11)).unwrap();
        builder.add_tick(&tick(1, 1, 10, 1.12, 1.13)).unwrap();
        let mut agg = builder.finish();
        assert_eq!(agg.last_boundary(), Some(at(1, 2, 0)));

        agg.extend_through(at(1, 4, 0), 60, EmptySlotPolicy::Exclude);
        assert_eq!(agg.slots.len(), 2);
        let incomplete: Vec<_> = agg.incomplete.into_iter().collect();
        assert_eq!(incomplete, vec![at(1, 3, 0), at(1, 4, 0)]);
    }

    #[test]
    fn test_extend_through_carries_last_stats() {
        let mut builder = hourly(EmptySlotPolicy::CarryForward, SlotAnchor::MonthStart);
        builder.add_tick(&tick(1, 0, 10, 1.10, 1.11)).unwrap();
        builder.add_tick(&tick(1, 1, 10, 1.12, 1.13)).unwrap();
        let mut agg = builder.finish();
        let last = agg.slots[1].1;

        agg.extend_through(at(1, 4, 0), 60, EmptySlotPolicy::CarryForward);
        let boundaries: Vec<_> = agg.slots.iter().map(|(b, _)| *b).collect();
        assert_eq!(boundaries, vec![at(1, 1, 0), at(1, 2, 0), at(1, 3, 0), at(1, 4, 0)]);
        assert_eq!(agg.slots[2].1, last);
        assert_eq!(agg.slots[3].1, last);
        assert!(agg.incomplete.is_empty());
    }

    #[test]
    fn test_extend_through_is_noop_when_already_covered() {
        let mut builder = hourly(EmptySlotPolicy::Exclude, SlotAnchor::FirstTick);
        builder.add_tick(&tick(5, 9, 0, 1.10, 1.11)).unwrap();
        let mut agg = builder.finish();
        let before = agg.clone();
        agg.extend_through(at(5, 10, 0), 60, EmptySlotPolicy::Exclude);
        assert_eq!(agg, before);

        let mut empty = SlotAggregate::default();
        empty.extend_through(at(5, 10, 0), 60, EmptySlotPolicy::Exclude);
        assert!(empty.incomplete.is_empty());
    }

    #[test]
    fn test_merge_into_series() {
        let mut eur = hourly(EmptySlotPolicy::Exclude, SlotAnchor::MonthStart);
        eur.add_tick(&tick(1, 0, 10, 1.10, 1.11)).unwrap();
        eur.add_tick(&tick(1, 2, 10, 1.12, 1.13)).unwrap();

        let mut jpy = SlotBuilder::new("USDJPY", 60, EmptySlotPolicy::Exclude, SlotAnchor::MonthStart);
        jpy.add_tick(&tick(1, 0, 20, 120.0, 120.1)).unwrap();
        jpy.add_tick(&tick(1, 1, 20, 120.2, 120.3)).unwrap();
        jpy.add_tick(&tick(1, 2, 20, 120.4, 120.5)).unwrap();

        let mut series = BucketSeries::new();
        let mut incomplete = BTreeSet::new();
        eur.finish().merge_into(&mut series, &mut incomplete);
        jpy.finish().merge_into(&mut series, &mut incomplete);

        assert_eq!(series.len(), 3);
        assert_eq!(incomplete.len(), 1);
        series.remove_boundaries(&incomplete);
        assert_eq!(series.len(), 2);
        assert!(series.buckets().all(|b| b.len() == 2));
    }
}
