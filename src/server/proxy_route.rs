//! Catch-all GET route that proxies everything the control surface does not
//! claim to a ring-resolved worker.

use crate::error::BalancerError;
use crate::server::AppState;
use actix_web::{
    HttpResponse, get,
    web::{Data, Path},
};

#[get("/{path:.*}")]
pub async fn proxy(
    path: Path<String>,
    app_state: Data<AppState>,
) -> Result<HttpResponse, BalancerError> {
    let path = path.into_inner();
    let upstream = app_state.router.forward(&path).await?;

    let mut response = HttpResponse::Ok();
    for (name, value) in upstream.headers.iter() {
        response.append_header((name.as_str(), value.as_bytes()));
    }

    Ok(response.body(upstream.body))
}
