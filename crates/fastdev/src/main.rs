//! fast - One command for the Python project lifecycle
//!
//! Bump, sync, upgrade, lint, test, tag and publish with whatever manager
//! the project uses (poetry, pdm, uv or plain pip).

mod cli;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use fastdev_core::FastDevError;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = cli::run(cli) {
        let code = match err.downcast_ref::<FastDevError>() {
            Some(FastDevError::CommandFailed { code, .. }) => *code,
            // Already reported along with the git status output
            Some(FastDevError::DirtyWorkTree) => 1,
            known => {
                eprintln!("{}", format!("Error: {:#}", err).red());
                known.map_or(1, FastDevError::exit_code)
            }
        };
        std::process::exit(code);
    }
}
