//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "buggy", version, about = "Buggy vehicle control CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results (and log) as JSON lines instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulated buggy under the control loop
    Drive {
        /// Stop after this many milliseconds (takes precedence over runner.max_run_ms)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Frames delivered to the vehicle at start, e.g. "E3,y200,"
        #[arg(long, value_name = "FRAMES")]
        script: Option<String>,
        /// Target speed in m/s, sent as a packed `v` frame
        #[arg(long, value_name = "MPS", allow_hyphen_values = true)]
        target_mps: Option<f32>,
        /// Resend the script and target every N ms to keep the watchdog fed
        #[arg(long, value_name = "MS")]
        keepalive_ms: Option<u64>,
        /// Write one CSV row per speed report
        #[arg(long, value_name = "FILE")]
        telemetry: Option<PathBuf>,
        /// Exchange frames over stdin/stdout in real time
        #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["script", "target_mps", "keepalive_ms"])]
        stdio: bool,
        /// Run against the wall clock instead of simulated time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
        /// Print the bytes the vehicle sent
        #[arg(long, action = ArgAction::SetTrue)]
        show_tx: bool,
        /// Exit with code 3 if the watchdog stopped the vehicle
        #[arg(long, action = ArgAction::SetTrue)]
        fail_on_watchdog: bool,
    },
    /// Parse frames and print one command per line
    Decode {
        /// Bytes to parse; stdin when omitted
        #[arg(long, value_name = "TEXT")]
        input: Option<String>,
    },
    /// Format commands as frames or text as UI/chained output
    Encode {
        /// Commands as CODE[VALUE], e.g. y200 Q
        #[arg(value_name = "CMD")]
        commands: Vec<String>,
        /// Text line to append after the commands
        #[arg(long, value_name = "STR")]
        text: Option<String>,
        /// Encode text as chained `p` frames
        #[arg(long, action = ArgAction::SetTrue)]
        chained: bool,
    },
    /// Load the config and run a short simulated loop
    SelfCheck,
    /// Print live wheel speeds from the GPIO encoders
    #[cfg(feature = "hardware")]
    Encoders {
        /// Sample period in ms
        #[arg(long, value_name = "MS", default_value_t = 100)]
        period_ms: u64,
        /// Stop after this many samples (0 runs until interrupted)
        #[arg(long, value_name = "N", default_value_t = 0)]
        samples: u64,
    },
}
