use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health`: liveness check.
///
/// Returns `200 OK` when both the account store and the object store answer,
/// `503 Service Unavailable` otherwise.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let accounts = state.accounts.ping().await;
    let store = state.store.health_check().await;

    if let Err(e) = &accounts {
        tracing::error!(error = %e, "Health check: account store unreachable");
    }
    if let Err(e) = &store {
        tracing::error!(
            error = %e,
            backend = state.store.backend_name(),
            "Health check: object store unreachable"
        );
    }

    let (status, label) = if accounts.is_ok() && store.is_ok() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (
        status,
        Json(json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
