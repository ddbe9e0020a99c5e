use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fluxbox_core::object_key;

use crate::{auth::Identity, error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ObjectsQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Size")]
    pub size: u64,
    #[serde(rename = "LastModified")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ObjectsResponse {
    pub files: Vec<FileEntry>,
    pub folders: Vec<String>,
}

/// `GET /objects?prefix=`: one folder level of the caller's files.
#[tracing::instrument(skip(state))]
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<ObjectsQuery>,
) -> Result<Json<ObjectsResponse>, AppError> {
    let user_id = identity.user_id.as_str();
    let prefix = object_key::add_listing_prefix(user_id, query.prefix.as_deref().unwrap_or(""))?;

    let listing = state.store.list(&prefix, Some("/")).await?;

    // Keys outside the caller's prefix are dropped rather than trusted.
    let files = listing
        .objects
        .into_iter()
        .filter_map(|o| {
            object_key::strip_prefix(user_id, &o.key).map(|key| FileEntry {
                key,
                size: o.size,
                last_modified: o.last_modified,
            })
        })
        .collect();
    let folders = listing
        .common_prefixes
        .iter()
        .filter_map(|p| object_key::strip_prefix(user_id, p))
        .filter(|p| !p.is_empty())
        .collect();

    Ok(Json(ObjectsResponse { files, folders }))
}
