mod eager_env;
mod error;
mod health;
mod lifecycle;
mod membership;
mod proxy;
mod ring;
mod server;
mod utils;

use crate::{
    eager_env::check_env,
    health::HealthMonitor,
    lifecycle::DockerProvider,
    membership::MembershipManager,
    proxy::ProxyRouter,
    ring::HashRing,
    server::{AppStateInner, start_server},
};
use parking_lot::Mutex;
use std::{net::TcpListener, sync::Arc, time::Duration};

const INITIAL_SERVERS: [&str; 3] = ["server1", "server2", "server3"];

#[tokio::main]
async fn main() {
    env_logger::builder()
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .init();
    check_env();

    // The initial replicas are started by the deployment itself; only the
    // ring needs to learn about them.
    let mut ring = HashRing::default();
    for srv in INITIAL_SERVERS {
        ring.add(srv).expect("failed to seed the ring");
    }
    let ring = Arc::new(Mutex::new(ring));

    let provider = Arc::new(DockerProvider::new(
        eager_env::LB_NETWORK.to_string(),
        eager_env::WORKER_IMAGE.to_string(),
        Duration::from_secs(*eager_env::PROVISION_TIMEOUT_SECONDS),
    ));

    let membership = Arc::new(MembershipManager::new(ring.clone(), provider));

    let router = ProxyRouter::new(
        ring.clone(),
        *eager_env::WORKER_PORT,
        Duration::from_secs(*eager_env::PROXY_TIMEOUT_SECONDS),
    );

    let state = Arc::new(AppStateInner {
        membership: membership.clone(),
        router,
    });

    let listener =
        TcpListener::bind(format!("0.0.0.0:{}", *eager_env::PORT)).expect("Failed to bind PORT");

    println!(
        "Listening on {}",
        listener.local_addr().expect("Failed to get local address")
    );

    let stop_monitor = if *eager_env::ENABLE_HEAL {
        let monitor = HealthMonitor::new(
            membership,
            *eager_env::WORKER_PORT,
            *eager_env::TARGET_REPLICAS,
            Duration::from_secs(*eager_env::HEALTH_INTERVAL_SECONDS),
            Duration::from_secs(*eager_env::PROBE_TIMEOUT_SECONDS),
        );
        Some(monitor.start())
    } else {
        None
    };

    start_server(state, listener)
        .await
        .expect("error while running server");

    if let Some(stop) = stop_monitor {
        stop();
    }
}
