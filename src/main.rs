mod ai;
mod cli;
mod credential;
mod logging;
mod model;
mod orchestrator;
mod storage;
#[cfg(feature = "tui")]
mod tui;
mod workflow;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = !args.is_interactive() || cfg!(not(feature = "tui"));

    let target = if is_non_tui {
        logging::LogTarget::Stderr
    } else {
        logging::LogTarget::File
    };
    // Logging is best-effort; the app works without it.
    let _ = logging::init(target);

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_non_tui {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
