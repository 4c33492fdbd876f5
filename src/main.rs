use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docs_edge::app::EdgeServices;
use docs_edge::config::{SiteConfig, db_path, log_dir};
use docs_edge::logging::init_logging;
use docs_edge::site::server;
use docs_edge::store::SqliteStore;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "docs-edge")]
#[command(version, about = "Edge proxy for versioned documentation hosted on GitHub")]
struct Cli {
    /// JSON configuration file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Also write logs below the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the documentation site (default)
    Serve {
        /// Address to listen on, overrides server.listen
        #[arg(long)]
        listen: Option<String>,

        /// Warm the cache for latest every N seconds
        #[arg(long)]
        warm_interval: Option<u64>,
    },
    /// Refresh releases and warm the cache for latest once
    Warm,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_dir = cli.log_file.then(log_dir);
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {:?}", dir))?;
    }
    let _guard = init_logging(cli.json_logs, log_dir.as_deref())?;

    let mut config = SiteConfig::load(cli.config.as_deref())?;
    let command = cli.command.unwrap_or(Command::Serve {
        listen: None,
        warm_interval: None,
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match command {
        Command::Serve {
            listen,
            warm_interval,
        } => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if warm_interval.is_some() {
                config.warm.interval_secs = warm_interval;
            }
            runtime.block_on(run_server(config))
        }
        Command::Warm => runtime.block_on(run_warm(config)),
    }
}

fn open_store(config: &SiteConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let path = config.server.database.clone().unwrap_or_else(db_path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {:?}", parent))?;
    }
    Ok(Arc::new(SqliteStore::new(&path)?))
}

async fn run_server(config: SiteConfig) -> anyhow::Result<()> {
    let services = EdgeServices::from_config(&config, open_store(&config)?);

    let warmer = config.warm_interval().map(|period| {
        info!("Warming latest every {:?}", period);
        services.spawn_warmer(period)
    });

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    server::serve(listener, server::app(Arc::new(services.router()))).await?;

    if let Some(warmer) = warmer {
        warmer.abort();
    }
    Ok(())
}

async fn run_warm(config: SiteConfig) -> anyhow::Result<()> {
    let services = EdgeServices::from_config(&config, open_store(&config)?);
    let report = services.warm().await?;
    info!(
        "Warmed {} artifacts ({} failed, {} skipped)",
        report.warmed, report.failed, report.skipped
    );
    Ok(())
}
