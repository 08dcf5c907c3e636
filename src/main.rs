use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use feedmerge::{BuildInfo, Config, FileStore, HttpFetcher};

const EXAMPLE_CONFIG: &str = include_str!("../config.example.toml");

/// Merge many RSS/Atom/JSON feeds into one Atom feed and serve it over HTTP.
#[derive(Debug, Parser)]
#[command(name = "feedmerge", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(required_unless_present = "print_example_config")]
    config: Option<PathBuf>,

    /// Print an example configuration and exit.
    #[arg(long)]
    print_example_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.print_example_config {
        print!("{EXAMPLE_CONFIG}");
        return ExitCode::SUCCESS;
    }

    let Some(path) = cli.config else {
        eprintln!("No configuration file given");
        return ExitCode::FAILURE;
    };

    let info = BuildInfo::current();
    let config = match load_config(&path, &info) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = feedmerge::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedmerge::logging::init_console_only(&config.logging.level);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(serve(config, info))
}

fn load_config(path: &Path, info: &BuildInfo) -> feedmerge::Result<Config> {
    let mut config = Config::load(path)?;
    config.resolve_defaults(info)?;
    config.validate()?;
    Ok(config)
}

async fn serve(config: Config, info: BuildInfo) -> ExitCode {
    info!("{} {}", info.app_title, info.version);
    info!("Feed file: {}", config.feed.file);

    let fetcher = match HttpFetcher::new(&config.fetch) {
        Ok(fetcher) => Arc::new(fetcher),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = Arc::new(FileStore::new(&config.feed.file));

    match feedmerge::run(&config, fetcher, store, shutdown_signal()).await {
        Ok(reason) if reason.is_clean() => ExitCode::SUCCESS,
        Ok(reason) => {
            error!("Stopped abnormally: {:?}", reason);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
