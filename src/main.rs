mod cli;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use embygram::{config, server, state};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env first: logging and config both read the environment
    dotenvy::dotenv().ok();

    let log_dir = std::env::var("LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(config::DEFAULT_LOG_DIR));
    init_logging(cli.verbose, &log_dir)?;

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = config::Config::from_env()?;

            // Override host/port from CLI if specified
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(config))
        }
        Commands::Validate => validate(),
        Commands::Version => {
            println!("embygram {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Log to stdout and to a daily-rotated file under the log directory.
///
/// `RUST_LOG` wins over the verbose flag when set.
fn init_logging(verbose: bool, log_dir: &Path) -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "embygram=trace,tower_http=debug".to_string()
        } else {
            "embygram=debug,tower_http=info".to_string()
        }
    });

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, log_dir, "emby-telegram-notifier.log");

    tracing_subscriber::registry()
        .with(EnvFilter::new(&env_filter))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_appender))
        .init();

    Ok(())
}

async fn serve(config: config::Config) -> Result<()> {
    tracing::info!("Starting Emby notification bridge");

    let store = state::NotifiedStore::load(
        config.notified_store_path.clone(),
        config.notified_max_entries,
    );

    server::start_server(config, store).await
}

fn validate() -> Result<()> {
    let config = config::Config::from_env()?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.host, config.port);
    println!("  Emby: {}", config.emby_base_url);
    println!(
        "  Episode premiere window: {} days",
        config.episode_premiered_within_days
    );
    println!(
        "  Season added window: {} days",
        config.season_added_within_days
    );
    println!(
        "  Notified store: {:?} (max {} entries)",
        config.notified_store_path, config.notified_max_entries
    );
    println!("  Log directory: {:?}", config.log_dir);

    Ok(())
}
