//! modsync binary entry point.

use std::process::ExitCode;

use modsync::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "MODSYNC_LOG";

fn init_logging(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new("modsync=debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let args = Cli::parse_args();
    init_logging(args.debug, args.quiet);

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
