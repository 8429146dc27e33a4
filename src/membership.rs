//! Validates and executes pool grow/shrink requests against the ring and the
//! lifecycle provider.
//!
//! All validation happens before any side effect. The ring lock is only held
//! for the in-memory mutation itself, never across provisioning calls.

use crate::error::BalancerError;
use crate::lifecycle::LifecycleProvider;
use crate::ring::HashRing;
use log::{info, warn};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;
use std::sync::Arc;

pub struct MembershipManager {
    ring: Arc<Mutex<HashRing>>,
    provider: Arc<dyn LifecycleProvider>,
    /// Seedable so tests get deterministic generated names and victim picks.
    rng: Mutex<StdRng>,
}

impl MembershipManager {
    pub fn new(ring: Arc<Mutex<HashRing>>, provider: Arc<dyn LifecycleProvider>) -> Self {
        Self {
            ring,
            provider,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_rng_seed(
        ring: Arc<Mutex<HashRing>>,
        provider: Arc<dyn LifecycleProvider>,
        seed: u64,
    ) -> Self {
        Self {
            ring,
            provider,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Snapshot of the current worker ids.
    pub fn members(&self) -> Vec<String> {
        self.ring.lock().members()
    }

    fn synthesize_name(&self, taken: &HashSet<String>) -> String {
        let mut rng = self.rng.lock();
        loop {
            let name = format!("server{}", rng.random_range(1000..10000));
            if !taken.contains(&name) {
                return name;
            }
        }
    }

    /// Grow the pool by `n` workers, honoring any explicitly provided names
    /// and synthesizing the rest. Returns the ids that were added.
    ///
    /// Requests exceeding the remaining ring capacity fail fast with
    /// [`BalancerError::RingExhausted`] before anything is provisioned.
    /// On a mid-batch failure the worker being added is rolled back and the
    /// call fails with [`BalancerError::ProvisioningFailed`], reporting the
    /// ids that made it in before the failure.
    pub async fn add(&self, n: i64, hostnames: Vec<String>) -> Result<Vec<String>, BalancerError> {
        if n < 1 {
            return Err(BalancerError::invalid_argument(
                "'n' must be a positive integer",
            ));
        }
        if hostnames.len() > n as usize {
            return Err(BalancerError::invalid_argument(
                "Too many hostnames provided",
            ));
        }

        let mut taken: HashSet<String> = self.members().into_iter().collect();

        // A request that cannot fit on the ring is rejected before name
        // synthesis or any provisioning call.
        if taken.len() + n as usize > self.ring.lock().capacity() {
            return Err(BalancerError::RingExhausted);
        }
        let mut new_hosts = Vec::with_capacity(n as usize);

        for host in hostnames {
            if taken.contains(&host) {
                return Err(BalancerError::DuplicateWorker(host));
            }
            taken.insert(host.clone());
            new_hosts.push(host);
        }

        while new_hosts.len() < n as usize {
            let host = self.synthesize_name(&taken);
            taken.insert(host.clone());
            new_hosts.push(host);
        }

        let mut started = Vec::with_capacity(new_hosts.len());

        for host in new_hosts {
            if let Err(e) = self.provider.start(&host).await {
                return Err(BalancerError::ProvisioningFailed {
                    started,
                    reason: e.to_string(),
                });
            }

            let ring_result = self.ring.lock().add(&host);

            if let Err(e) = ring_result {
                // The process is up but unroutable; tear it down again.
                if let Err(stop_err) = self.provider.stop(&host).await {
                    warn!("failed to roll back worker {host}: {stop_err}");
                }
                return Err(BalancerError::ProvisioningFailed {
                    started,
                    reason: e.to_string(),
                });
            }

            info!("added worker {host}");
            started.push(host);
        }

        Ok(started)
    }

    /// Shrink the pool by `n` workers. Explicitly named workers are removed
    /// first; the remainder is picked uniformly at random.
    ///
    /// Stopping the process is best effort: the ring entry is always freed,
    /// because a routable-but-dead worker is worse than a ring gap.
    pub async fn remove(
        &self,
        n: i64,
        hostnames: Vec<String>,
    ) -> Result<Vec<String>, BalancerError> {
        let current = self.members();

        if n < 1 || n as usize > current.len() {
            return Err(BalancerError::invalid_argument("'n' out of range"));
        }
        if hostnames.len() > n as usize {
            return Err(BalancerError::invalid_argument(
                "Too many hostnames provided",
            ));
        }

        let mut to_remove = Vec::with_capacity(n as usize);

        for host in hostnames {
            if !current.contains(&host) {
                return Err(BalancerError::UnknownWorker(host));
            }
            if to_remove.contains(&host) {
                return Err(BalancerError::invalid_argument(
                    "Duplicate hostnames provided",
                ));
            }
            to_remove.push(host);
        }

        let mut candidates: Vec<String> = current
            .into_iter()
            .filter(|c| !to_remove.contains(c))
            .collect();

        while to_remove.len() < n as usize {
            let victim = {
                let mut rng = self.rng.lock();
                candidates.swap_remove(rng.random_range(0..candidates.len()))
            };
            to_remove.push(victim);
        }

        for host in &to_remove {
            if let Err(e) = self.provider.stop(host).await {
                warn!("failed to stop worker {host}: {e}");
            }

            self.ring.lock().remove(host);
            info!("removed worker {host}");
        }

        Ok(to_remove)
    }
}
