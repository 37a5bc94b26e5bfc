use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use tagwatch::app::App;
use tagwatch::cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = tagwatch::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        tagwatch::logging::init_console_only(&config.logging.level);
    }

    info!("tagwatch {}", env!("CARGO_PKG_VERSION"));

    let Command::Collect(args) = &cli.command;
    let result = async {
        let app = App::new(config).await?;
        if args.http {
            app.run_service().await
        } else {
            app.run_once().await
        }
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
