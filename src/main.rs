//! Command-line entry point.
//!
//! Loads the JSON configuration, wires up the console log subscriber, and
//! runs the controller until an operator signal stops it. Configuration and
//! first-launch failures exit non-zero.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use rebootvisor::{Config, Controller, LogWriter, Subscribe};

#[derive(Parser, Debug)]
#[command(
    name = "rebootvisor",
    version,
    about = "Scheduled graceful-restart supervisor for console servers"
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = "reboot_config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match Config::from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("rebootvisor: {e}");
            return ExitCode::FAILURE;
        }
    };

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let controller = Controller::new(cfg, subscribers);

    match controller.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rebootvisor: {e}");
            ExitCode::FAILURE
        }
    }
}
