//! Boundary to whatever actually runs worker processes.
//!
//! The balancer only ever asks for a worker to be started or stopped by id;
//! a container runtime, a process supervisor, or a test double can sit behind
//! the trait.

use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to invoke container runtime: {0}")]
    Io(#[from] std::io::Error),

    #[error("container runtime timed out")]
    Timeout,

    #[error("container runtime error: {0}")]
    Runtime(String),
}

#[async_trait]
pub trait LifecycleProvider: Send + Sync {
    /// Start a worker process bound to `worker_id`. The worker must become
    /// reachable under that id as a hostname.
    async fn start(&self, worker_id: &str) -> Result<(), ProvisionError>;

    /// Stop the worker process. Stopping an already-gone worker is a success.
    async fn stop(&self, worker_id: &str) -> Result<(), ProvisionError>;
}

/// Runs workers as containers through the docker CLI, on a shared network so
/// that container names double as hostnames.
pub struct DockerProvider {
    network: String,
    image: String,
    timeout: Duration,
}

impl DockerProvider {
    pub fn new(network: String, image: String, timeout: Duration) -> Self {
        Self {
            network,
            image,
            timeout,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, ProvisionError> {
        debug!("docker {}", args.join(" "));

        let output = tokio::time::timeout(self.timeout, Command::new("docker").args(args).output())
            .await
            .map_err(|_| ProvisionError::Timeout)??;

        Ok(output)
    }
}

#[async_trait]
impl LifecycleProvider for DockerProvider {
    async fn start(&self, worker_id: &str) -> Result<(), ProvisionError> {
        let env = format!("SERVER_ID={worker_id}");
        let output = self
            .run(&[
                "run",
                "-d",
                "--name",
                worker_id,
                "--network",
                &self.network,
                "-e",
                &env,
                &self.image,
            ])
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ProvisionError::Runtime(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    async fn stop(&self, worker_id: &str) -> Result<(), ProvisionError> {
        let output = self.run(&["rm", "-f", worker_id]).await?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // A worker that is already gone counts as stopped.
        if stderr.contains("No such container") {
            Ok(())
        } else {
            Err(ProvisionError::Runtime(stderr))
        }
    }
}
