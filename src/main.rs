use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swerve_zenoh_runtime::config::{ChassisRevision, DEFAULT_CONFIG_PATH, DriveConfig};

/// Swerve drivetrain runtime
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Drivetrain config file (JSON); defaults are used if it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the chassis revision from the config file
    #[arg(long, value_enum)]
    chassis: Option<ChassisRevision>,

    /// Start the module indexing sequence as soon as the loop starts
    #[arg(long)]
    index_on_start: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let args = Args::parse();

    let mut config = match DriveConfig::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error ({}): {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    if let Some(chassis) = args.chassis {
        config.chassis = chassis;
    }
    info!("Drivetrain config: {:?}", config);

    if let Err(e) = swerve_zenoh_runtime::runtime::run(config, args.index_on_start).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
