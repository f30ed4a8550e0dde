use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use gator::cli::{self, Cli, Context};
use gator::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match Config::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };
    config.apply_env_overrides();
    if let Some(user) = cli.user {
        config.session.current_user = Some(user);
    }
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }

    info!("gator {}", env!("CARGO_PKG_VERSION"));

    let ctx = match Context::open(config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to open database: {}", e);
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout();
    let result = cli::execute(&ctx, cli.command, &mut stdout).await;
    ctx.db.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(scope = ?e.scope(), "command failed: {}", e);
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
