//! Operator-facing control surface: inspect, grow and shrink the pool.

use crate::error::BalancerError;
use crate::server::AppState;
use actix_web::{
    HttpResponse, delete, get, post,
    web::{Data, Json},
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    /// Number of workers to add or remove. Defaults to 0 so a missing field
    /// fails validation the same way a non-positive value does.
    #[serde(default)]
    pub n: i64,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

fn replica_envelope(members: Vec<String>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": {
            "N": members.len(),
            "replicas": members,
        },
        "status": "successful",
    }))
}

#[get("/rep")]
pub async fn replicas(app_state: Data<AppState>) -> HttpResponse {
    replica_envelope(app_state.membership.members())
}

#[post("/add")]
pub async fn add_servers(
    app_state: Data<AppState>,
    body: Json<ScaleRequest>,
) -> Result<HttpResponse, BalancerError> {
    let request = body.into_inner();

    app_state
        .membership
        .add(request.n, request.hostnames)
        .await?;

    Ok(replica_envelope(app_state.membership.members()))
}

#[delete("/rm")]
pub async fn remove_servers(
    app_state: Data<AppState>,
    body: Json<ScaleRequest>,
) -> Result<HttpResponse, BalancerError> {
    let request = body.into_inner();

    app_state
        .membership
        .remove(request.n, request.hostnames)
        .await?;

    Ok(replica_envelope(app_state.membership.members()))
}

#[cfg(test)]
mod tests {
    use crate::lifecycle::testing::StubProvider;
    use crate::server::start_server_test;
    use crate::utils::init_logging;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn control_server() -> (u16, Arc<StubProvider>) {
        let provider = Arc::new(StubProvider::default());
        let (port, _) = start_server_test(
            &["server1", "server2", "server3"],
            provider.clone(),
            5000,
        )
        .await;
        (port, provider)
    }

    #[tokio::test]
    async fn test_add_grows_the_pool() {
        init_logging();

        let (port, provider) = control_server().await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://localhost:{}/add", port))
            .json(&json!({"n": 2, "hostnames": ["server4"]}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "successful");
        assert_eq!(body["message"]["N"], 5);

        let replicas = body["message"]["replicas"].as_array().unwrap();
        assert!(replicas.iter().any(|r| r == "server4"));

        // Both new workers went through the lifecycle provider.
        assert_eq!(provider.started.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_requests() {
        let (port, provider) = control_server().await;
        let client = reqwest::Client::new();
        let url = format!("http://localhost:{}/add", port);

        for body in [
            json!({"n": 0}),
            json!({"n": -1}),
            json!({}),
            json!({"n": 1, "hostnames": ["a", "b"]}),
            json!({"n": 1, "hostnames": ["server1"]}),
        ] {
            let response = client.post(&url).json(&body).send().await.unwrap();
            assert_eq!(response.status(), 400, "body: {body}");

            let payload: Value = response.json().await.unwrap();
            assert_eq!(payload["status"], "failure");
            assert!(
                payload["message"].as_str().unwrap().starts_with("<Error>"),
                "payload: {payload}"
            );
        }

        assert!(provider.started.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_still_gets_the_envelope() {
        let (port, provider) = control_server().await;
        let client = reqwest::Client::new();
        let url = format!("http://localhost:{}/add", port);

        for raw in [r#"{"n": "abc"}"#, r#"{"hostnames": "server4"}"#, "not json"] {
            let response = client
                .post(&url)
                .header("content-type", "application/json")
                .body(raw)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 400, "body: {raw}");

            let payload: Value = response.json().await.unwrap();
            assert_eq!(payload["status"], "failure", "body: {raw}");
            assert!(
                payload["message"].as_str().unwrap().starts_with("<Error>"),
                "payload: {payload}"
            );
        }

        assert!(provider.started.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rm_shrinks_the_pool() {
        let (port, provider) = control_server().await;
        let client = reqwest::Client::new();

        let response = client
            .delete(format!("http://localhost:{}/rm", port))
            .json(&json!({"n": 1, "hostnames": ["server1"]}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"]["N"], 2);

        let replicas = body["message"]["replicas"].as_array().unwrap();
        assert!(!replicas.iter().any(|r| r == "server1"));
        assert_eq!(*provider.stopped.lock(), vec![String::from("server1")]);
    }

    #[tokio::test]
    async fn test_rm_rejects_bad_requests() {
        let (port, provider) = control_server().await;
        let client = reqwest::Client::new();
        let url = format!("http://localhost:{}/rm", port);

        for body in [
            json!({"n": 0}),
            json!({"n": 4}),
            json!({"n": 1, "hostnames": ["server9"]}),
            json!({"n": 1, "hostnames": ["server1", "server2"]}),
            json!({"n": 2, "hostnames": ["server1", "server1"]}),
        ] {
            let response = client.delete(&url).json(&body).send().await.unwrap();
            assert_eq!(response.status(), 400, "body: {body}");

            let payload: Value = response.json().await.unwrap();
            assert_eq!(payload["status"], "failure");
        }

        assert!(provider.stopped.lock().is_empty());
    }
}
