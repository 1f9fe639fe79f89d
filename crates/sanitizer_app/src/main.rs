mod args;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info};
use sanitizer_engine::{load_config, RunMode, RunOutcome, Sanitizer};

use crate::args::Args;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::initialize(engine_logging::level_for(args.verbose), args.log_file.as_deref());

    match run(&args) {
        Ok(outcome) => {
            println!("{}", outcome.rendered);
            if let Some(path) = &outcome.report_path {
                engine_info!("Report saved to {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            engine_error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<RunOutcome> {
    let config_path = args.config_path();
    let config = load_config(&config_path)
        .with_context(|| format!("loading settings from {}", config_path.display()))?;

    let mode = if args.dry_run {
        RunMode::Preview
    } else {
        RunMode::Apply
    };
    let sanitizer = Sanitizer::new(config, &args.dir, mode)
        .with_clock(Arc::new(|| chrono::Utc::now().to_rfc3339()));
    sanitizer
        .run_blocking()
        .with_context(|| format!("sanitizing {}", args.dir.display()))
}
