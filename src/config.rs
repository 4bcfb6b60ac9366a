use std::path::PathBuf;

use clap::Parser;

use crate::constants::{DEFAULT_HARMONIC_MULTIPLES, DEFAULT_HARMONIC_TOLERANCE, DEFAULT_RX_SUSPECT_THRESHOLD};
use crate::error::{Error, Result};
use crate::grouper::TimeRegressionPolicy;
use crate::harmonic::HarmonicPolicy;

/// Filter WSPR logs by frequency range and mark "image" reports.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Input log file (csv) in WSPR log format
    #[arg(value_name = "LOG")]
    pub log: PathBuf,

    /// Output file for the marked image reports (csv, WSPR log format)
    #[arg(value_name = "OUT")]
    pub out: PathBuf,

    /// Lower bound of the frequency range (MHz)
    #[arg(long)]
    pub flo: Option<f64>,

    /// Upper bound of the frequency range (MHz)
    #[arg(long)]
    pub fhi: Option<f64>,

    /// Input file is gzip compressed (implied by a .gz extension)
    #[arg(long, default_value_t = false)]
    pub igz: bool,

    /// Half-width in Hz of the band around each mains multiple
    #[arg(long, default_value_t = DEFAULT_HARMONIC_TOLERANCE)]
    pub tolerance: i64,

    /// Number of multiples of 50 Hz and 60 Hz treated as mains harmonics
    #[arg(long, default_value_t = DEFAULT_HARMONIC_MULTIPLES)]
    pub multiples: u32,

    /// Flag receivers imaging against more than this many distinct transmitters
    #[arg(long, default_value_t = DEFAULT_RX_SUSPECT_THRESHOLD)]
    pub rx_suspect_threshold: usize,

    /// Handling of reports older than the current time window
    #[arg(long, value_enum, default_value_t = TimeRegressionPolicy::NewWindow)]
    pub time_regression: TimeRegressionPolicy,

    /// Drop every later report from a receiver once it is flagged
    #[arg(long, default_value_t = false)]
    pub exclude_suspect_rx: bool,

    /// Leave mains harmonic artifacts out of the marked output
    #[arg(long, default_value_t = false)]
    pub drop_artifacts: bool,

    /// Also write every non-artifact report prefixed with solar times
    #[arg(long, value_name = "FILE")]
    pub annotated: Option<PathBuf>,

    /// Write a JSON run summary
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Write <OUT>_rx.prop, <OUT>_tx.prop and <OUT>_pair.prop image proportion tables
    #[arg(long, default_value_t = false)]
    pub prop: bool,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Settings consumed by the classification engine
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            harmonic: HarmonicPolicy::new(self.tolerance, self.multiples),
            rx_suspect_threshold: self.rx_suspect_threshold,
            time_regression: self.time_regression,
            exclude_suspect_rx: self.exclude_suspect_rx,
            frequency_range: FrequencyRange {
                lo: self.flo,
                hi: self.fhi,
            },
        }
    }
}

/// Inclusive frequency bounds; a missing bound is open
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrequencyRange {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
}

impl FrequencyRange {
    pub fn contains(&self, frequency: f64) -> bool {
        self.lo.map_or(true, |lo| frequency >= lo) && self.hi.map_or(true, |hi| frequency <= hi)
    }
}

/// Scalar parameters of the classification engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub harmonic: HarmonicPolicy,
    pub rx_suspect_threshold: usize,
    pub time_regression: TimeRegressionPolicy,
    /// Skip flagged receivers for the rest of the run
    pub exclude_suspect_rx: bool,
    pub frequency_range: FrequencyRange,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            harmonic: HarmonicPolicy::default(),
            rx_suspect_threshold: DEFAULT_RX_SUSPECT_THRESHOLD,
            time_regression: TimeRegressionPolicy::default(),
            exclude_suspect_rx: false,
            frequency_range: FrequencyRange::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.harmonic.multiples == 0 {
            return Err(Error::Config("harmonic multiples must be at least 1".to_string()));
        }
        if self.harmonic.tolerance < 0 {
            return Err(Error::Config("harmonic tolerance must not be negative".to_string()));
        }
        // A band reaching zero would swallow every small offset
        if self.harmonic.tolerance >= 50 {
            return Err(Error::Config(format!(
                "harmonic tolerance {} reaches zero offset",
                self.harmonic.tolerance
            )));
        }
        if let (Some(lo), Some(hi)) = (self.frequency_range.lo, self.frequency_range.hi) {
            if lo > hi {
                return Err(Error::Config(format!("frequency range {} > {}", lo, hi)));
            }
        }
        Ok(())
    }
}
