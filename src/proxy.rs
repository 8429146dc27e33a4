//! Resolves inbound requests to a worker via the ring and forwards them.
//!
//! The router never retries against a different worker and never mutates the
//! ring; remediation of dead workers belongs to the health monitor.

use crate::error::BalancerError;
use crate::ring::HashRing;
use log::debug;
use parking_lot::Mutex;
use rand::Rng;
use reqwest::header::{CONNECTION, CONTENT_LENGTH, HeaderMap, TRANSFER_ENCODING};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct ProxiedResponse {
    /// Upstream headers minus framing; the response is re-framed downstream.
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub struct ProxyRouter {
    ring: Arc<Mutex<HashRing>>,
    client: reqwest::Client,
    worker_port: u16,
}

impl ProxyRouter {
    pub fn new(ring: Arc<Mutex<HashRing>>, worker_port: u16, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build proxy http client");

        Self {
            ring,
            client,
            worker_port,
        }
    }

    /// Forward a GET for `path` to the worker the ring resolves for a fresh
    /// random routing key.
    pub async fn forward(&self, path: &str) -> Result<ProxiedResponse, BalancerError> {
        let key = rand::rng().random_range(100_000..1_000_000);

        // Lock only for the lookup, never across the proxied call.
        let worker = self.ring.lock().route(&key.to_string())?;

        let url = format!("http://{worker}:{}/{path}", self.worker_port);
        debug!("routing key {key} -> {worker}, forwarding to {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| BalancerError::Unreachable {
                worker: worker.clone(),
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(BalancerError::UpstreamError {
                path: path.to_string(),
            });
        }

        let mut headers = response.headers().clone();
        for name in [CONTENT_LENGTH, TRANSFER_ENCODING, CONNECTION] {
            headers.remove(&name);
        }

        let body = response
            .bytes()
            .await
            .map_err(|_| BalancerError::Unreachable { worker })?
            .to_vec();

        Ok(ProxiedResponse { headers, body })
    }
}
