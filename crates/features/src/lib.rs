//! Feature extraction for the timeslot pipeline.
//!
//! This crate handles:
//! - Sliding windows over ordered slot buckets
//! - Feature vector and direction label extraction per window

pub mod emitter;
pub mod window;

pub use emitter::FeatureLabelEmitter;
pub use window::{sliding_windows, window_count, SlidingWindows};
