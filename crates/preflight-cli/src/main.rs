//! Preflight CLI - run pre-apply safety checks against planned Kubernetes changes

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "preflight")]
#[command(author = "Preflight Contributors")]
#[command(version)]
#[command(about = "Run pre-apply safety checks against planned Kubernetes changes", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare existing and desired manifests and run enabled checks
    Check {
        /// Manifest file(s) describing what is currently applied
        #[arg(short, long, required = true, num_args = 1..)]
        existing: Vec<PathBuf>,

        /// Manifest file(s) describing what is about to be applied
        #[arg(short, long, required = true, num_args = 1..)]
        desired: Vec<PathBuf>,

        /// Comma-separated checks to enable; every other check is disabled
        #[arg(long, env = "PREFLIGHT_CHECKS")]
        preflight: Option<String>,

        /// Configuration document with preflightRules
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List known preflight checks
    List,
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Check {
            existing,
            desired,
            preflight,
            config,
        } => commands::check::run(&existing, &desired, preflight.as_deref(), config.as_deref()),

        Commands::List => commands::list::run(),
    };

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
