use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    admission::{PendingUpload, UploadPhase, UploadRequest, UploadTarget},
    auth::Identity,
    error::AppError,
    routes::required,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub file_size: Option<String>,
}

/// `GET /upload?key=&contentType=&fileSize=`: admit an upload and return a
/// presigned PUT target, or 403 with the quota message.
#[tracing::instrument(skip(state))]
pub async fn request_upload(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<UploadQuery>,
) -> Result<Json<UploadTarget>, AppError> {
    let relative_path = required(query.key, "Key is required")?;
    let size_bytes = required(query.file_size, "File size is required")?
        .trim()
        .parse::<u64>()
        .map_err(|_| AppError::BadRequest("Invalid file size".to_string()))?;

    let target = state
        .admission
        .admit_upload(
            &identity.user_id,
            UploadRequest {
                relative_path,
                content_type: query.content_type.filter(|c| !c.is_empty()),
                size_bytes,
            },
        )
        .await?;
    Ok(Json(target))
}

#[derive(Debug, Deserialize)]
pub struct CompleteUploadRequest {
    pub key: Option<String>,
}

/// `POST /upload/complete`: the client finished its PUT.
#[tracing::instrument(skip(state))]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<CompleteUploadRequest>,
) -> Result<Json<Value>, AppError> {
    let key = required(body.key, "Key is required")?;
    let released = state
        .admission
        .complete_upload(&identity.user_id, &key)
        .await?;
    Ok(Json(json!({ "success": true, "released": released })))
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub pending: Option<PendingUpload>,
}

/// `GET /upload/pending`
#[tracing::instrument(skip(state))]
pub async fn get_pending(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Json<PendingResponse> {
    Json(PendingResponse {
        pending: state.admission.pending_upload(&identity.user_id).await,
    })
}

#[derive(Debug, Serialize)]
pub struct ResolvedUpload {
    #[serde(flatten)]
    pub target: UploadTarget,
    pub phase: UploadPhase,
}

/// `POST /upload/pending/resolve`: retry the blocked upload after a plan
/// change. 404 when nothing is pending, 403 while it still does not fit.
#[tracing::instrument(skip(state))]
pub async fn resolve_pending(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<ResolvedUpload>, AppError> {
    let target = state
        .admission
        .resolve_pending_upload(&identity.user_id)
        .await?;
    Ok(Json(ResolvedUpload {
        target,
        phase: UploadPhase::Allowed,
    }))
}

/// `DELETE /upload/pending`
#[tracing::instrument(skip(state))]
pub async fn cancel_pending(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Json<Value> {
    let cancelled = state
        .admission
        .cancel_pending_upload(&identity.user_id)
        .await;
    Json(json!({ "success": true, "cancelled": cancelled }))
}
