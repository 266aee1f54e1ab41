use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use gator::commands::{self, Command};
use gator::config::{default_config_dir, Config};
use gator::session::Session;
use gator::shutdown::{self, ShutdownTrigger};
use gator::storage::{Database, DatabaseError};

#[derive(Parser, Debug)]
#[command(name = "gator", version, about = "Command-line RSS aggregator")]
struct Args {
    /// Config file (default: ~/.config/gator/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Fire `trigger` on Ctrl-C or, on unix, SIGTERM.
async fn wait_for_signal(trigger: ShutdownTrigger) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
        }
        _ = terminate => {}
    }

    tracing::info!("Shutdown requested");
    trigger.trigger();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so stdout only carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_dir()
            .context("Cannot locate the config directory")?
            .join("config.toml"),
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let db_path = config.resolve_db_path(&config_path);
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;

    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: the database at {} is locked by another process.", db_path.display());
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("Failed to open database"),
    };

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(wait_for_signal(trigger));

    let mut session = Session::new(config, config_path, db);
    let mut stdout = std::io::stdout();
    commands::dispatch(&mut session, args.command, &shutdown, &mut stdout).await?;

    Ok(())
}
