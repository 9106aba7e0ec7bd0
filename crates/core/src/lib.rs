//! Core types and configuration for the timeslot pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Tick and slot statistics types
//! - Bucket series and feature/label records
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, EmptySlotPolicy, FeatureMode, SlotAnchor};
pub use error::{Error, Result};
pub use types::*;
