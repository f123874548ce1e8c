//! youtrack-updater entry point
//!
//! Parses arguments, sets up logging, runs the upgrade, and maps the result to
//! an exit code: errors are shown with [`user_friendly_error`] and exit with
//! 1, Ctrl-C exits with 130.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use youtrack_updater::cli::Cli;
use youtrack_updater::constants::INTERRUPTED_EXIT_CODE;
use youtrack_updater::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.build_config().log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // The losing branch is dropped before exiting, which kills any engine child.
    let result = tokio::select! {
        result = cli.execute() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match result {
        Some(Ok(outcome)) => {
            tracing::debug!("Finished: {outcome:?}");
            Ok(())
        }
        Some(Err(e)) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
        None => {
            eprintln!();
            eprintln!("{}", "Interrupted".yellow());
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
}
