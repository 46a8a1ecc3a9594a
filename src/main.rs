// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use selfie_kiosk::backends::camera::CameraBackendType;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "selfie-kiosk")]
#[command(about = "Photo booth: countdown, watermarked capture and download codes")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Settings that take precedence over the config file
#[derive(clap::Args, Debug, Default)]
pub struct Overrides {
    /// Config file (default: $XDG_CONFIG_HOME/selfie-kiosk/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Countdown length in seconds
    #[arg(long, global = true)]
    countdown: Option<u32>,

    /// Camera backend (still, gstreamer)
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<CameraBackendType>,

    /// Camera device for live backends (e.g. /dev/video0)
    #[arg(long, global = true)]
    device: Option<String>,

    /// Image served by the still backend
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Watermark image
    #[arg(long, global = true)]
    watermark: Option<PathBuf>,

    /// Upload endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the capture page until Ctrl-C
    Booth {
        /// Number of photos to take (0 = until interrupted)
        #[arg(short, long, default_value = "0")]
        rounds: u32,

        /// Seconds a finished photo stays on display before the retake
        #[arg(long, default_value = "15")]
        hold: u64,
    },

    /// Take a single photo
    Capture {
        /// Directory to save the JPEG into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available cameras
    List,

    /// Upload the last cached photo again
    UploadLast,

    /// Print the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}

fn parse_backend(value: &str) -> Result<CameraBackendType, String> {
    match value.to_ascii_lowercase().as_str() {
        "still" => Ok(CameraBackendType::Still),
        "gstreamer" => Ok(CameraBackendType::GStreamer),
        other => Err(format!("unknown backend '{}' (expected still or gstreamer)", other)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=selfie_kiosk=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(&cli.overrides)?;

    match cli.command {
        Commands::Booth { rounds, hold } => cli::run_booth(config, rounds, hold),
        Commands::Capture { output } => cli::capture_once(config, output),
        Commands::List => cli::list_cameras(&config),
        Commands::UploadLast => cli::upload_last(&config),
        Commands::Config { save } => cli::show_config(&config, &cli.overrides, save),
    }
}
