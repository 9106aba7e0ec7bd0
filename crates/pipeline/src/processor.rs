//! Period-by-period processing.
//!
//! For every period: aggregate each tracked archive into slots, drop
//! incomplete boundaries, window the ordered buckets and append one record
//! per window to the output.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use timeslot_core::{Bucket, BucketSeries, Config, Result};
use timeslot_features::{sliding_windows, window_count, FeatureLabelEmitter};
use timeslot_ingestion::{open_tick_archive, SlotAggregate, SlotBuilder};
use tracing::{debug, info};

use crate::layout::{ArchiveRef, DatasetLayout, Period};
use crate::output::RecordWriter;
use crate::summary::RunSummary;

/// Runs the aggregation, windowing and emission stages.
pub struct Processor {
    config: Config,
    emitter: FeatureLabelEmitter,
}

impl Processor {
    /// Create a processor from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let emitter = FeatureLabelEmitter::new(
            config.features.estimate_instrument.clone(),
            config.features.mode,
        );
        Ok(Self { config, emitter })
    }

    /// Process every period under `root` into the configured output file.
    pub fn run(&self, root: impl AsRef<Path>) -> Result<RunSummary> {
        let layout = DatasetLayout::discover(root)?;
        let periods = layout.periods(&self.config.dataset)?;
        info!(
            root = %layout.root().display(),
            instruments = layout.instruments().len(),
            periods = periods.len(),
            output = %self.config.output.path.display(),
            "starting run"
        );

        let mut writer = RecordWriter::create(&self.config.output.path)?;
        let mut summary = RunSummary::default();
        for period in &periods {
            let period_summary = self.process_period(period, &mut writer)?;
            summary.merge(&period_summary);
        }
        writer.flush()?;

        info!(
            periods = summary.periods,
            records = writer.written(),
            ticks = summary.ticks,
            slots = summary.slots,
            excluded = summary.excluded_slots,
            windows = summary.windows,
            positive_ratio = summary.positive_ratio(),
            "run complete"
        );
        Ok(summary)
    }

    /// Process one period and append its records.
    pub fn process_period<W: Write>(
        &self,
        period: &Period,
        writer: &mut RecordWriter<W>,
    ) -> Result<RunSummary> {
        info!(period = period.index, archives = period.archives.len(), "processing period");

        let mut summary = RunSummary {
            periods: 1,
            ..RunSummary::default()
        };
        let series = self.build_series(&period.archives, &mut summary)?;
        self.emit_series(&series, writer, &mut summary)?;
        Ok(summary)
    }

    /// Aggregate archives into one series with incomplete boundaries removed.
    pub fn build_series(
        &self,
        archives: &[ArchiveRef],
        summary: &mut RunSummary,
    ) -> Result<BucketSeries> {
        let mut aggregates = Vec::with_capacity(archives.len());
        for archive in archives {
            let (aggregate, ticks) = self.aggregate_archive(archive)?;
            summary.archives += 1;
            summary.ticks += ticks;
            aggregates.push(aggregate);
        }

        // Instruments whose ticks stop early still owe the slots up to the
        // period's last boundary.
        let agg = &self.config.aggregation;
        let through = aggregates.iter().filter_map(SlotAggregate::last_boundary).max();
        let mut series = BucketSeries::new();
        let mut incomplete = BTreeSet::new();
        for mut aggregate in aggregates {
            if let Some(through) = through {
                aggregate.extend_through(through, agg.slot_minutes, agg.empty_slot_policy);
            }
            aggregate.merge_into(&mut series, &mut incomplete);
        }
        // Grids that do not line up (per-instrument anchors) leave buckets
        // missing an instrument; those cannot yield a fixed-width row.
        incomplete.extend(series.partial_boundaries());

        let excluded = series.remove_boundaries(&incomplete);
        summary.slots += series.len() as u64;
        summary.excluded_slots += excluded as u64;
        debug!(slots = series.len(), excluded, "series built");
        Ok(series)
    }

    /// Aggregate one archive. Returns the aggregate and the tick count.
    pub fn aggregate_archive(&self, archive: &ArchiveRef) -> Result<(SlotAggregate, u64)> {
        let agg = &self.config.aggregation;
        let mut builder = SlotBuilder::new(
            archive.symbol.clone(),
            agg.slot_minutes,
            agg.empty_slot_policy,
            agg.anchor,
        );

        let mut ticks = open_tick_archive(&archive.path)?;
        for tick in ticks.by_ref() {
            builder.add_tick(&tick?)?;
        }
        let tick_count = builder.tick_count();
        let aggregate = builder.finish();

        debug!(
            archive = %archive.path.display(),
            symbol = %archive.symbol,
            ticks = tick_count,
            first = ?ticks.stats().first_ts,
            last = ?ticks.stats().last_ts,
            slots = aggregate.slots.len(),
            incomplete = aggregate.incomplete.len(),
            "archive aggregated"
        );
        Ok((aggregate, tick_count))
    }

    /// Window the series and write one record per window.
    pub fn emit_series<W: Write>(
        &self,
        series: &BucketSeries,
        writer: &mut RecordWriter<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let buckets: Vec<&Bucket> = series.buckets().collect();
        debug!(
            buckets = buckets.len(),
            windows = window_count(buckets.len(), self.config.sequence_len()),
            "emitting windows"
        );
        for window in sliding_windows(buckets, self.config.sequence_len()) {
            let record = self.emitter.emit(&window)?;
            writer.write_record(&record)?;
            summary.windows += 1;
            summary.positive_labels += u64::from(record.label);
        }
        Ok(())
    }
}
