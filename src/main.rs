//! Codeskel CLI entry point.

use clap::Parser;
use codeskel::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codeskel=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Skeleton(args) => cli::run_skeleton(args),
        Commands::Classes(args) => cli::run_classes(args),
        Commands::Search(args) => cli::run_search(args),
        Commands::Members(args) => cli::run_members(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
