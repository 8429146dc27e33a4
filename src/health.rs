//! Self-healing control loop: probe every worker, evict the unreachable ones,
//! then grow the pool back to the target size.
//!
//! Iterations are strictly sequential; evictions always complete before
//! replenishment starts, so an about-to-be-evicted worker never counts toward
//! the target.

use crate::membership::MembershipManager;
use futures::future;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub struct HealthMonitor {
    membership: Arc<MembershipManager>,
    client: reqwest::Client,
    worker_port: u16,
    target_replicas: usize,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        membership: Arc<MembershipManager>,
        worker_port: u16,
        target_replicas: usize,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .build()
            .expect("failed to build probe http client");

        Self {
            membership,
            client,
            worker_port,
            target_replicas,
            interval,
        }
    }

    /// A worker is healthy iff its heartbeat endpoint answers 2xx within the
    /// probe timeout. A single miss counts as a failure for this cycle.
    async fn probe(&self, worker: &str) -> bool {
        let url = format!("http://{worker}:{}/heartbeat", self.worker_port);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn run_iteration(&self) {
        let members = self.membership.members();

        let results = future::join_all(members.iter().map(|w| self.probe(w))).await;

        let unhealthy: Vec<&String> = members
            .iter()
            .zip(results)
            .filter_map(|(worker, healthy)| (!healthy).then_some(worker))
            .collect();

        for worker in unhealthy {
            warn!("worker {worker} missed its heartbeat, evicting");

            if let Err(e) = self.membership.remove(1, vec![worker.clone()]).await {
                // Tolerate per-worker failures; the next cycle retries.
                error!("failed to evict worker {worker}: {e}");
            }
        }

        while self.membership.members().len() < self.target_replicas {
            match self.membership.add(1, Vec::new()).await {
                Ok(added) => info!("replenished pool with {added:?}"),
                Err(e) => {
                    error!("failed to replenish pool: {e}");
                    break;
                }
            }
        }
    }

    pub fn start(self) -> impl FnOnce() {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);

            loop {
                ticker.tick().await;
                self.run_iteration().await;
            }
        });

        let close_function = move || {
            task.abort();
            info!("HealthMonitor stopped");
        };

        info!("HealthMonitor started");

        close_function
    }
}
