//! Worker runtime
//!
//! A worker registers once, then pulls batches from the scheduler, runs each
//! job through a [`JobExecutor`] and reports the outcome.

pub mod client;
pub mod executor;
pub mod runner;

pub use client::{ClientConfig, ClientError, MeshClient};
pub use executor::{CommandExecutor, ExecutorError, JobExecutor, JobOutcome};
pub use runner::{RoundStats, WorkerRunner};
