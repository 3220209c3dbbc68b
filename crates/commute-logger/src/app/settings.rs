use clap::Parser;
use commute_trip_lib::RecorderConfig;
use std::path::PathBuf;
use std::time::Duration;

use super::replay::ReplayConfig;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Commute Logger - Replay a recorded GPS trace and save it as a labeled commute trip
pub struct Settings {
    /// Trace to replay (.gpx, or .jsonl with one fix per line)
    #[clap(value_name = "FILE")]
    pub input: PathBuf,

    /// Route label stored in the trip and used in its filename
    #[clap(short, long, default_value = "")]
    pub label: String,

    /// Directory trips are saved into (created if missing)
    #[clap(short, long, default_value = "commute-logs")]
    pub output_dir: PathBuf,

    /// Delay between delivered fixes in milliseconds (0 = as fast as possible)
    #[clap(long, default_value = "0")]
    pub interval_ms: u64,

    /// Minimum distance in meters between delivered fixes
    #[clap(long, default_value = "3.0")]
    pub min_distance_m: f64,

    /// Discard fixes whose reported accuracy is worse than this many meters
    #[clap(long, default_value = "50.0")]
    pub max_accuracy_m: f32,

    /// Refuse to export a trip that was not stopped first
    #[clap(long, default_value = "false")]
    pub require_explicit_stop: bool,

    /// Print the trip to stdout instead of saving it
    #[clap(long, default_value = "false")]
    pub dry_run: bool,

    /// Write a Chrome trace of the run (needs the `profiling` feature)
    #[clap(long, value_name = "FILE")]
    pub trace_file: Option<PathBuf>,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            max_accuracy_m: self.max_accuracy_m,
            require_explicit_stop: self.require_explicit_stop,
        }
    }

    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            interval: Duration::from_millis(self.interval_ms),
            min_distance_m: self.min_distance_m,
        }
    }
}
