//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "fotsim", version, about = "Optical loss tester simulator")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/fotsim.toml")]
    pub config: PathBuf,

    /// Passive-component catalog CSV (strict header)
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Seed for the measurement rng; omit for a random seed
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// JSON file holding the student record (enables the `register` command)
    #[arg(long, value_name = "FILE")]
    pub student_file: Option<PathBuf>,

    /// Print state snapshots as JSON instead of a text summary
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to the
    /// config's [logging] level, then "info"
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Drive the instrument panel interactively from stdin
    Run,
    /// Replay a newline-separated command script and print the final state
    Script {
        /// Script file: button names, `wait <ms>`, `select <id>`, `clean`,
        /// `register <name> <group>`
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// Validate an assembled connection scheme listing
    CheckScheme {
        /// TOML file with `correct` id order and `assembled` elements
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}
