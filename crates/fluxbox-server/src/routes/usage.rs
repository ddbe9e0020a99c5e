use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use fluxbox_core::plan::BYTES_PER_MB;

use crate::{auth::Identity, error::AppError, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub total_size: u64,
    #[serde(rename = "totalSizeMB")]
    pub total_size_mb: f64,
    pub file_count: u64,
    pub limit_bytes: u64,
    #[serde(rename = "limitMB")]
    pub limit_mb: u64,
    pub plan_id: String,
}

/// `GET /storage/usage`: totals under the caller's prefix against their plan.
#[tracing::instrument(skip(state))]
pub async fn storage_usage(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<UsageResponse>, AppError> {
    let account = state.admission.account(&identity.user_id).await?;
    let usage = state.admission.usage(&identity.user_id).await?;

    Ok(Json(UsageResponse {
        total_size: usage.total_bytes,
        total_size_mb: usage.total_mb(),
        file_count: usage.file_count,
        limit_bytes: account.storage_limit_bytes,
        limit_mb: account.storage_limit_bytes / BYTES_PER_MB,
        plan_id: account.plan_id,
    }))
}
