//! Tick row parsing.
//!
//! Rows are `symbol,timestamp,bid,ask` without a header, timestamps in
//! `YYYYMMDD HH:MM:SS.ffffff` form.

use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use timeslot_core::{Error, Result, Tick};

/// Timestamp layout of the tick rows.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S%.f";

/// Number of fields in a tick row.
const FIELD_COUNT: usize = 4;

/// Statistics about the rows parsed from one source.
#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    /// Rows turned into ticks.
    pub rows: u64,
    /// Timestamp of the first tick.
    pub first_ts: Option<NaiveDateTime>,
    /// Timestamp of the last tick.
    pub last_ts: Option<NaiveDateTime>,
}

impl ParseStats {
    fn record(&mut self, tick: &Tick) {
        self.rows += 1;
        if self.first_ts.is_none() {
            self.first_ts = Some(tick.ts);
        }
        self.last_ts = Some(tick.ts);
    }
}

/// Parse a tick timestamp.
pub fn parse_timestamp(field: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(field, TIMESTAMP_FORMAT)
        .map_err(|e| Error::parse(format!("invalid timestamp '{}': {}", field, e)))
}

fn parse_price(field: &str, name: &str) -> Result<f64> {
    let value = field
        .parse::<f64>()
        .map_err(|_| Error::parse(format!("non-numeric {} '{}'", name, field)))?;
    if !value.is_finite() {
        return Err(Error::parse(format!("non-finite {} '{}'", name, field)));
    }
    Ok(value)
}

/// Parse one CSV record into a tick. The symbol column is not used.
pub fn parse_record(record: &StringRecord) -> Result<Tick> {
    if record.len() != FIELD_COUNT {
        return Err(Error::parse(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            record.len()
        )));
    }
    let ts = parse_timestamp(&record[1])?;
    let bid = parse_price(&record[2], "bid")?;
    let ask = parse_price(&record[3], "ask")?;
    Ok(Tick::new(ts, bid, ask))
}

/// Iterator over the ticks of a headerless CSV source.
pub struct TickReader<R: Read> {
    source: String,
    records: csv::StringRecordsIntoIter<R>,
    stats: ParseStats,
}

impl<R: Read> TickReader<R> {
    /// Wrap a reader. `source` names the input in error messages.
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        let records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader)
            .into_records();
        Self {
            source: source.into(),
            records,
            stats: ParseStats::default(),
        }
    }

    /// Statistics for the rows read so far.
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }
}

impl<R: Read> Iterator for TickReader<R> {
    type Item = Result<Tick>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(Error::parse(format!("{}: {}", self.source, e)))),
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let tick = parse_record(&record)
            .map_err(|e| Error::parse(format!("{} row {}: {}", self.source, line, e)));
        if let Ok(tick) = &tick {
            self.stats.record(tick);
        }
        Some(tick)
    }
}
