//! Data ingestion for the timeslot pipeline.
//!
//! This crate handles:
//! - Tick archive access (one CSV entry per zip archive)
//! - Tick row parsing
//! - Fixed-length slot aggregation per instrument

pub mod archive;
pub mod slot_builder;
pub mod tick_parser;

pub use archive::open_tick_archive;
pub use slot_builder::{SlotAggregate, SlotBuilder};
pub use tick_parser::{ParseStats, TickReader};
