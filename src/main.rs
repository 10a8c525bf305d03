use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use gridstress::config::{ProgramMode, Settings, DEFAULT_SETTINGS_FILE};
use gridstress::logging::{self, DEFAULT_LOG_FILE};
use gridstress::orchestrator::{self, RunOptions};

/// Randomize and stress-test power-distribution graphs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the key=value settings file
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Workflow to run, overriding the ProgramMethod setting
    #[arg(short, long, value_enum)]
    mode: Option<ProgramMode>,

    /// Seed for the random source (defaults to OS entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// File that log output is appended to
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write a JSON report next to each stressed graph
    #[arg(long)]
    json_report: bool,
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let log_file = (!args.no_log_file).then_some(args.log_file.as_path());
    logging::init(&args.log_level, log_file);

    info!("Program start");

    // Failures are reported here; the process still exits cleanly
    if let Err(e) = run(&args) {
        error!("{}", logging::error_chain(&e));
    }

    info!("Program done");
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let settings = Settings::load(&args.config)
        .wrap_err_with(|| format!("Failed to load settings from {:?}", args.config))?;
    settings.log_entries();

    let mode = match args.mode {
        Some(mode) => mode,
        None => settings.program_mode()?,
    };

    let mut rng = match args.seed {
        Some(seed) => {
            info!("Seeding random source with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let options = RunOptions {
        json_report: args.json_report,
    };
    orchestrator::run(mode, &settings, &options, &mut rng)
}
