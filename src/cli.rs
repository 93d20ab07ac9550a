use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mesh-scheduler")]
#[command(about = "Mesh job scheduler and worker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler HTTP API with the lease reaper
    Serve(ServeArgs),
    /// Reclaim expired leases once and exit
    Reap(ReapArgs),
    /// Run a worker that executes leased jobs with an external program
    Worker(WorkerArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Configuration file (overrides `MESH_CONFIG`)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ReapArgs {
    /// Configuration file (overrides `MESH_CONFIG`)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct WorkerArgs {
    /// Scheduler base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Shared secret sent in `X-Mesh-Token`
    #[arg(long, env = "MESH_SHARED_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Stable worker identity
    #[arg(long)]
    pub node_id: String,

    /// Only lease jobs for these sites (repeatable)
    #[arg(long = "site")]
    pub sites: Vec<String>,

    /// Batch size requested per lease
    #[arg(long, default_value_t = 10)]
    pub max_jobs: u32,

    /// Sleep between polls when there is no work
    #[arg(long, default_value_t = 5000)]
    pub poll_interval_ms: u64,

    /// Program run once per job; the job JSON arrives on stdin
    #[arg(long)]
    pub exec: PathBuf,

    /// Arguments passed to the program
    #[arg(last = true)]
    pub args: Vec<String>,
}
