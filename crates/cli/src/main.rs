//! `timeslot` command-line runner.
//!
//! Turns a directory of per-instrument tick archives into a labelled
//! feature dataset.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use timeslot_core::{Config, EmptySlotPolicy, FeatureMode, SlotAnchor};
use timeslot_pipeline::Processor;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmptySlotsArg {
    /// Drop the slot for every instrument
    Exclude,
    /// Repeat the instrument's previous slot
    CarryForward,
}

impl From<EmptySlotsArg> for EmptySlotPolicy {
    fn from(arg: EmptySlotsArg) -> Self {
        match arg {
            EmptySlotsArg::Exclude => EmptySlotPolicy::Exclude,
            EmptySlotsArg::CarryForward => EmptySlotPolicy::CarryForward,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FeaturesArg {
    /// Close spread and bid delta per instrument
    SpreadDelta,
    /// All eight slot statistics per instrument
    RawFields,
}

impl From<FeaturesArg> for FeatureMode {
    fn from(arg: FeaturesArg) -> Self {
        match arg {
            FeaturesArg::SpreadDelta => FeatureMode::SpreadDelta,
            FeaturesArg::RawFields => FeatureMode::RawFields,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AnchorArg {
    /// Midnight on the first day of the month
    MonthStart,
    /// The instrument's first tick
    FirstTick,
}

impl From<AnchorArg> for SlotAnchor {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::MonthStart => SlotAnchor::MonthStart,
            AnchorArg::FirstTick => SlotAnchor::FirstTick,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "timeslot",
    version,
    about = "Aggregate currency ticks into time slots and emit windowed feature/label rows"
)]
struct Cli {
    /// Directory holding one sub-directory of monthly zip archives per instrument
    root: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output dataset path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Instrument whose bid direction is the label
    #[arg(long)]
    estimate: Option<String>,

    /// Comma-separated list of tracked instruments
    #[arg(long, value_delimiter = ',')]
    instruments: Option<Vec<String>>,

    /// Feature slots per window
    #[arg(long)]
    window_size: Option<usize>,

    /// Slot length in minutes
    #[arg(long)]
    slot_minutes: Option<u32>,

    /// Empty slot policy
    #[arg(long, value_enum)]
    empty_slots: Option<EmptySlotsArg>,

    /// Feature layout
    #[arg(long, value_enum)]
    features: Option<FeaturesArg>,

    /// First slot anchor
    #[arg(long, value_enum)]
    anchor: Option<AnchorArg>,

    /// Print the run summary as JSON on stdout
    #[arg(long, default_value_t = false)]
    summary_json: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(estimate) = &self.estimate {
            config.features.estimate_instrument = estimate.clone();
        }
        if let Some(instruments) = &self.instruments {
            config.dataset.tracked_instruments = instruments.clone();
        }
        if let Some(window_size) = self.window_size {
            config.features.window_size = window_size;
        }
        if let Some(slot_minutes) = self.slot_minutes {
            config.aggregation.slot_minutes = slot_minutes;
        }
        if let Some(policy) = self.empty_slots {
            config.aggregation.empty_slot_policy = policy.into();
        }
        if let Some(mode) = self.features {
            config.features.mode = mode.into();
        }
        if let Some(anchor) = self.anchor {
            config.aggregation.anchor = anchor.into();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    info!(
        estimate = %config.features.estimate_instrument,
        window_size = config.features.window_size,
        slot_minutes = config.aggregation.slot_minutes,
        empty_slots = ?config.aggregation.empty_slot_policy,
        features = ?config.features.mode,
        anchor = ?config.aggregation.anchor,
        "configuration resolved"
    );

    let processor = Processor::new(config).context("invalid configuration")?;
    let summary = processor
        .run(&cli.root)
        .with_context(|| format!("run over {} failed", cli.root.display()))?;

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
