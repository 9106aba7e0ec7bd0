//! Batch pipeline for the timeslot feature extractor.
//!
//! This crate provides:
//! - Dataset layout discovery (instrument directories, period archives)
//! - Period-by-period processing into feature/label records
//! - Dataset file writing and reading
//! - Run summary counters

pub mod layout;
pub mod output;
pub mod processor;
pub mod summary;

pub use layout::{ArchiveRef, DatasetLayout, Period};
pub use output::{read_records, RecordWriter};
pub use processor::Processor;
pub use summary::RunSummary;
