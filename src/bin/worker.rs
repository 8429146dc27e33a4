//! Trivial worker process: identifies itself on `/home` and answers liveness
//! probes on `/heartbeat`.

use actix_web::{App, HttpResponse, HttpServer, get};
use serde_json::json;
use std::env;

#[get("/home")]
async fn home() -> HttpResponse {
    let server_id = env::var("SERVER_ID").unwrap_or_else(|_| String::from("unknown"));

    HttpResponse::Ok().json(json!({
        "message": format!("Hello from Server: {server_id}"),
        "status": "successful",
    }))
}

#[get("/heartbeat")]
async fn heartbeat() -> HttpResponse {
    HttpResponse::Ok().finish()
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);

    HttpServer::new(|| App::new().service(home).service(heartbeat))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
