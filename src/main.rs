// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use snapcam::backends::camera::types::CameraBackendType;
use snapcam::config::Config;
use snapcam::constants::app_info;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "snapcam")]
#[command(about = "Take pictures and browse them from the terminal")]
#[command(version = app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Camera backend (gstreamer or test-pattern)
    #[arg(long, global = true)]
    backend: Option<CameraBackendType>,

    /// Directory photos are saved to and listed from
    #[arg(long, global = true)]
    photos_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    Cameras,

    /// List saved photos, newest first
    Gallery,

    /// Print the directory photos are saved to
    Location,

    /// Take a photo without opening the app
    Photo {
        /// Use the front camera instead of the configured lens
        #[arg(short, long)]
        front: bool,

        /// Output directory (default: the gallery directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=snapcam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = cli.photos_dir {
        config.photos_dir = Some(dir);
    }

    match cli.command {
        Some(Commands::Cameras) => cli::list_cameras(config.backend),
        Some(Commands::Gallery) => cli::list_gallery(&config),
        Some(Commands::Location) => cli::print_location(&config),
        Some(Commands::Photo { front, output }) => cli::take_photo(&config, front, output),
        Some(Commands::Config { init }) => cli::show_config(&config, init),
        None => snapcam::terminal::run(config),
    }
}
