mod classifier;
mod cli;
mod credentials;
mod draft;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod storage;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let target = if args.is_one_shot() || cfg!(not(feature = "tui")) {
        logging::LogTarget::Stderr
    } else {
        match logging::default_log_path() {
            Some(path) => logging::LogTarget::File(path),
            None => logging::LogTarget::Stderr,
        }
    };
    if let Err(e) = logging::init_tracing(&args.log_level, target) {
        eprintln!("warning: logging disabled: {e:#}");
    }

    let is_one_shot = args.is_one_shot();
    cli::run(args).await?;
    // Explicit exit so a pending stdin read cannot hold the process open.
    if is_one_shot {
        std::process::exit(0);
    }
    Ok(())
}
