use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use fluxbox_core::object_key;

use crate::{
    auth::Identity, error::AppError, routes::delete::KeyQuery, routes::required, state::AppState,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// `GET /download?key=`: stream an object back as an attachment.
#[tracing::instrument(skip(state))]
pub async fn download(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<KeyQuery>,
) -> Result<Response, AppError> {
    let relative = required(query.key, "Key is required")?;
    let key = object_key::add_prefix(&identity.user_id, &relative)?;

    let object = state.store.get_stream(&key).await?;

    let content_type = object
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or(HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = (StatusCode::OK, Body::from_stream(object.stream)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(object_key::basename(&relative)),
    );
    if let Some(len) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    Ok(response)
}

/// `attachment; filename="<name>"`, falling back to a generic name when the
/// file name cannot be carried in a header value.
fn content_disposition(file_name: &str) -> HeaderValue {
    let cleaned = file_name.replace('"', "");
    HeaderValue::from_str(&format!("attachment; filename=\"{cleaned}\""))
        .unwrap_or(HeaderValue::from_static("attachment; filename=\"download\""))
}
