mod proxy_route;
mod replicas;

use crate::error::BalancerError;
use crate::membership::MembershipManager;
use crate::proxy::ProxyRouter;
use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    web::{Data, JsonConfig},
};
use std::{net::TcpListener, sync::Arc};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub membership: Arc<MembershipManager>,
    pub router: ProxyRouter,
}

pub async fn start_server(state: AppState, listener: TcpListener) -> std::io::Result<()> {
    let data = Data::new(state);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec!["Content-Type"])
            .max_age(3600);

        // Malformed or wrong-typed bodies must produce the same JSON envelope
        // as every other validation failure.
        let json_config = JsonConfig::default().error_handler(|err, _req| {
            BalancerError::invalid_argument(format!("Invalid request body: {err}")).into()
        });

        // The catch-all proxy route must come after the control endpoints.
        App::new()
            .wrap(cors)
            .app_data(json_config)
            .service(replicas::replicas)
            .service(replicas::add_servers)
            .service(replicas::remove_servers)
            .service(proxy_route::proxy)
            .app_data(data.clone())
    })
    .listen(listener)
    .expect("Failed to bind port")
    .run()
    .await
}

#[cfg(test)]
pub async fn start_server_test(
    initial: &[&str],
    provider: Arc<dyn crate::lifecycle::LifecycleProvider>,
    worker_port: u16,
) -> (u16, AppState) {
    use crate::ring::HashRing;
    use parking_lot::Mutex;
    use std::time::Duration;

    let mut ring = HashRing::default();
    for srv in initial {
        ring.add(srv).expect("failed to seed test ring");
    }
    let ring = Arc::new(Mutex::new(ring));

    let membership = Arc::new(MembershipManager::with_rng_seed(
        ring.clone(),
        provider,
        42,
    ));
    let router = ProxyRouter::new(ring, worker_port, Duration::from_secs(2));

    let state = Arc::new(AppStateInner { membership, router });

    let listener = TcpListener::bind("0.0.0.0:0").expect("failed to bind to random port");
    let port = listener
        .local_addr()
        .expect("failed to get local addr")
        .port();

    let server_state = state.clone();
    tokio::spawn(async move {
        start_server(server_state, listener).await.unwrap();
    });

    (port, state)
}
