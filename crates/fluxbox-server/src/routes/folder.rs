use std::sync::Arc;

use axum::{extract::State, Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use fluxbox_core::object_key;

use crate::{auth::Identity, error::AppError, routes::required, state::AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub folder_path: Option<String>,
    pub parent_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateFolderResponse {
    pub success: bool,
    pub path: String,
}

/// `POST /folder`: write the zero-byte `<parentPath><folderPath>/` marker.
#[tracing::instrument(skip(state))]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<CreateFolderRequest>,
) -> Result<Json<CreateFolderResponse>, AppError> {
    let folder = required(body.folder_path, "Folder name is required")?;
    let path = object_key::folder_key(body.parent_path.as_deref().unwrap_or(""), &folder)?;
    let key = object_key::add_prefix(&identity.user_id, &path)?;

    state.store.put(&key, Bytes::new(), None).await?;
    tracing::info!(user_id = %identity.user_id, key = %key, "Folder created");
    Ok(Json(CreateFolderResponse {
        success: true,
        path,
    }))
}
