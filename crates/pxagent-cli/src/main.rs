use clap::Parser;
use pxagent_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    if cli.verbose {
        logging::init_logging_stderr();
    } else if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("cannot log to file, using stderr: {:#}", err);
    }

    if let Err(err) = cli.run().await {
        eprintln!("pxagent error: {:#}", err);
        std::process::exit(1);
    }
}
