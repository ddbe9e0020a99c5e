use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use fluxbox_duckdb::payments::{PaymentIntent, PaymentStatus};

use crate::{
    accounts::UserAccount, auth::Identity, error::AppError, payments, routes::required,
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    pub plan_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentResponse {
    pub intent_id: String,
    pub plan_id: String,
    pub amount_minor_units: u64,
    pub currency: String,
    pub status: PaymentStatus,
}

impl From<PaymentIntent> for IntentResponse {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            intent_id: intent.id,
            plan_id: intent.plan_id,
            amount_minor_units: intent.amount_minor_units,
            currency: intent.currency,
            status: intent.status,
        }
    }
}

/// `POST /payments/intents`: start buying a plan.
#[tracing::instrument(skip(state))]
pub async fn create_intent(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<IntentResponse>), AppError> {
    let plan_id = required(body.plan_id, "planId is required")?;
    let intent = payments::create_payment_intent(
        &state.admission,
        state.accounts.as_ref(),
        &identity.user_id,
        &plan_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(intent.into())))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub intent_id: Option<String>,
}

/// `POST /payments/confirm`: settle an intent and apply its plan.
/// Replaying a confirmed intent returns the current account unchanged.
#[tracing::instrument(skip(state))]
pub async fn confirm(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(body): Json<ConfirmRequest>,
) -> Result<Json<UserAccount>, AppError> {
    let intent_id = required(body.intent_id, "intentId is required")?;
    let account = payments::confirm_payment(
        &state.admission,
        state.accounts.as_ref(),
        state.payments.as_ref(),
        &identity.user_id,
        &intent_id,
    )
    .await?;
    Ok(Json(account))
}
