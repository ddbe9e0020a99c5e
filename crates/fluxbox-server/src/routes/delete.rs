use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use fluxbox_core::object_key;

use crate::{auth::Identity, error::AppError, routes::required, state::AppState};

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

/// `DELETE /delete?key=`: succeeds whether or not the object existed.
#[tracing::instrument(skip(state))]
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<KeyQuery>,
) -> Result<Json<Value>, AppError> {
    let relative = required(query.key, "Key is required")?;
    let key = object_key::add_prefix(&identity.user_id, &relative)?;

    state.store.delete(&key).await?;
    tracing::info!(user_id = %identity.user_id, key = %key, "Object deleted");
    Ok(Json(json!({ "success": true })))
}
