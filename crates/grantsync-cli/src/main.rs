use grantsync_core::logging;

mod cli;

use crate::cli::Cli;

fn main() {
    // Initialize logging as early as possible; fall back to stderr if the log file is unusable.
    if let Err(err) = logging::init_logging() {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable ({err:#}), logging to stderr");
    }

    // Parse CLI and dispatch.
    if let Err(err) = Cli::run_from_args() {
        tracing::error!("grantsync failed: {err:#}");
        eprintln!("grantsync error: {:#}", err);
        std::process::exit(1);
    }
}
