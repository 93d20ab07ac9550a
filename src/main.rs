mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands, WorkerArgs};
use mesh_scheduler::config::Config;
use mesh_scheduler::observability::{Metrics, init_tracing};
use mesh_scheduler::scheduler::LeaseReaper;
use mesh_scheduler::store::MeshStore;
use mesh_scheduler::worker::{ClientConfig, CommandExecutor, MeshClient, WorkerRunner};
use tokio::sync::watch;
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = load_config(args.config)?;
            mesh_scheduler::api::run(config, args.address).await?;
        }
        Commands::Reap(args) => {
            let config = load_config(args.config)?;
            reap(config).await?;
        }
        Commands::Worker(args) => worker(args).await?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    let config = match path {
        Some(path) => Config::load_file(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

async fn reap(config: Config) -> Result<(), AnyError> {
    let store = MeshStore::connect(&config.database.url, config.database.max_connections).await?;
    let reaper = LeaseReaper::new(store.clone(), &config.scheduler, Arc::new(Metrics::new()));

    let stats = reaper.sweep_once().await?;
    info!(requeued = stats.requeued, failed = stats.failed, "Sweep finished");

    store.close().await;
    Ok(())
}

async fn worker(args: WorkerArgs) -> Result<(), AnyError> {
    let client = MeshClient::new(&args.server, &args.secret, ClientConfig::default())?;
    let executor = CommandExecutor::new(args.exec, args.args);

    let runner = WorkerRunner::builder()
        .client(client)
        .executor(Arc::new(executor))
        .node_id(args.node_id)
        .maybe_want_sites((!args.sites.is_empty()).then_some(args.sites))
        .max_jobs(args.max_jobs)
        .poll_interval(Duration::from_millis(args.poll_interval_ms))
        .build();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, finishing current batch");
            let _ = shutdown_tx.send(true);
        }
    });

    runner.run(shutdown_rx).await?;
    Ok(())
}
