// src/server/auth.rs

//! Master-secret authentication
//!
//! Every controller request must carry the shared master secret in the
//! `Authorization` header. An unregistered node has no secret yet and
//! therefore rejects everything.

use axum::extract::{Request, State};
use axum::http::{StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use super::SharedState;

/// Whether the presented token matches the stored master secret
pub fn token_matches(token: Option<&str>, secret: Option<&str>) -> bool {
    match (token, secret) {
        (Some(token), Some(secret)) => !token.is_empty() && token == secret,
        _ => false,
    }
}

/// Middleware rejecting requests without a valid master secret
pub async fn require_master_secret(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if token_matches(token, state.master.master_secret().as_deref()) {
        next.run(request).await
    } else {
        debug!("Rejecting request without valid master secret");
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}
