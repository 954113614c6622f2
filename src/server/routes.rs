// src/server/routes.rs

//! Axum router for the agent endpoints

use crate::node::{NodeState, NodeStatus};
use axum::extract::State;
use axum::middleware;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::{SharedState, auth};

/// Response body of the notification endpoint
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub state: NodeState,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(node_info))
        .route("/notify", post(notify))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_master_secret,
        ))
        .with_state(state)
}

/// `GET /` - identity and aggregated state
async fn node_info(State(state): State<SharedState>) -> Json<NodeStatus> {
    Json(state.info.status())
}

/// `POST /notify` - run one synchronization pass
///
/// The pass itself never fails; a panicked or cancelled worker is still
/// reported as a failure state rather than an error response.
async fn notify(State(state): State<SharedState>) -> Json<NotifyResponse> {
    let coordinator = Arc::clone(&state.coordinator);
    let state = tokio::task::spawn_blocking(move || coordinator.synchronize())
        .await
        .unwrap_or_else(|e| {
            error!("Synchronization task failed to complete: {e}");
            NodeState::Failure
        });

    Json(NotifyResponse { state })
}
