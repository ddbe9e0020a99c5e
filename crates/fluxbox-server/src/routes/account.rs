use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{accounts::UserAccount, auth::Identity, error::AppError, state::AppState};

/// `GET /account`
#[tracing::instrument(skip(state))]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(state.admission.account(&identity.user_id).await?))
}
