
pub mod constants;
pub mod error;
pub mod report;
pub mod reader;
pub mod grouper;
pub mod harmonic;
pub mod classifier;
pub mod detector;
pub mod stats;
pub mod solartime;
pub mod coordinator;
pub mod output;
pub mod config;
