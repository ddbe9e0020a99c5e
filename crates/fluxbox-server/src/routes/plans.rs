use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use fluxbox_core::plan::{self, Plan, PLANS};

use crate::{auth::Identity, error::AppError, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlansResponse {
    pub plans: &'static [Plan],
    pub upgrade_options: Vec<&'static Plan>,
    pub current_plan_id: String,
}

/// `GET /plans`: the plan table plus the plans larger than the caller's.
#[tracing::instrument(skip(state))]
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<PlansResponse>, AppError> {
    let account = state.admission.account(&identity.user_id).await?;
    Ok(Json(PlansResponse {
        plans: PLANS,
        upgrade_options: plan::upgrade_options(account.storage_limit_bytes),
        current_plan_id: account.plan_id,
    }))
}
