//! Error taxonomy for the balancer, mapped onto the control-surface JSON
//! envelope. Every failure response has the shape
//! `{"message": "<Error> ...", "status": "failure"}`.

use actix_web::{HttpResponse, http::StatusCode};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BalancerError {
    /// Client-correctable validation failure; the message is the operator-facing text.
    #[error("<Error> {0}")]
    InvalidArgument(String),

    #[error("<Error> Server {0} already exists")]
    DuplicateWorker(String),

    #[error("<Error> Server {0} does not exist")]
    UnknownWorker(String),

    #[error("<Error> No free slot left on the ring")]
    RingExhausted,

    #[error("<Error> Ring is empty - add a server first")]
    EmptyRing,

    /// A multi-step grow operation failed partway. `started` lists the workers
    /// that were fully added before the failure, so callers can tell the pool
    /// is in a partially-grown state.
    #[error("<Error> Provisioning failed ({reason}); servers added before the failure: [{}]", .started.join(", "))]
    ProvisioningFailed { started: Vec<String>, reason: String },

    #[error("<Error> Could not reach {worker}")]
    Unreachable { worker: String },

    #[error("<Error> '/{path}' not found")]
    UpstreamError { path: String },
}

impl actix_web::ResponseError for BalancerError {
    fn status_code(&self) -> StatusCode {
        match self {
            BalancerError::InvalidArgument(_)
            | BalancerError::DuplicateWorker(_)
            | BalancerError::UnknownWorker(_)
            | BalancerError::UpstreamError { .. } => StatusCode::BAD_REQUEST,
            BalancerError::EmptyRing => StatusCode::SERVICE_UNAVAILABLE,
            BalancerError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            BalancerError::RingExhausted | BalancerError::ProvisioningFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string(),
            "status": "failure",
        }))
    }
}

impl BalancerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
