mod cli;
mod commands;
mod logging;
mod store;

use clap::Parser;
use eyre::Result;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    let cfg = fotsim_config::load_file(&args.config)?;
    let level = args
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    logging::init(level, args.json, cfg.logging.file.as_deref())?;
    tracing::debug!(config = %args.config.display(), "configuration loaded");

    let opts = commands::LabOptions {
        catalog: args.catalog.as_deref(),
        student_file: args.student_file.as_deref(),
        seed: args.seed,
        json: args.json,
    };
    match &args.cmd {
        Commands::Run => commands::run(&cfg, &opts),
        Commands::Script { file } => commands::script(&cfg, &opts, file),
        Commands::CheckScheme { file } => commands::check_scheme(file),
    }
}
