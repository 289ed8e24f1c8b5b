//! Command-line interface for capscribe
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Voice capture and transcription pipeline
#[derive(Parser, Debug)]
#[command(name = "capscribe", version, about = "Voice capture and transcription pipeline")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record from the microphone, transcribe, and optionally upload
    Record {
        /// Audio input device (e.g., pipewire)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,

        /// Capture duration. Examples: 5s, 1m30s
        #[arg(long, short = 'd', value_name = "DURATION", default_value = "5s", value_parser = parse_duration_arg)]
        duration: Duration,

        /// Transcription deadline (default from config). Examples: 30s, 2m
        #[arg(long, value_name = "DURATION", value_parser = parse_duration_arg)]
        timeout: Option<Duration>,

        /// Speech model file (e.g., models/ggml-base.bin)
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,

        /// POST the finished artifact to the configured upload endpoint
        #[arg(long)]
        upload: bool,
    },

    /// List available audio input devices
    Devices,
}

/// Parse a duration string.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`30s`, `5m`, `2h`), and compound (`1h30m`, `2m30s`).
fn parse_duration_arg(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}
