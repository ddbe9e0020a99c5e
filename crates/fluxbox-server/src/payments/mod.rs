//! Two-phase plan purchases: create an intent, then confirm it.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::{info, warn};

use fluxbox_core::plan::{self, PLAN_CURRENCY};
use fluxbox_duckdb::payments::{NewPaymentIntent, PaymentIntent, PaymentStatus};

use crate::accounts::{AccountStore, UserAccount};
use crate::admission::{AdmissionController, AdmissionError, UploadPhase};

pub mod simulated;

pub use simulated::{DecliningPaymentGateway, SimulatedPaymentGateway};

/// Outcome of a [`PaymentGateway::settle`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Settled,
    Declined(String),
}

/// Collects the money for a payment intent.
///
/// The trait is object-safe via an explicit boxed-future return type so it can
/// be stored as `Arc<dyn PaymentGateway>` in [`crate::state::AppState`].
pub trait PaymentGateway: Send + Sync {
    fn settle<'a>(
        &'a self,
        intent: &'a PaymentIntent,
    ) -> Pin<Box<dyn Future<Output = PaymentOutcome> + Send + 'a>>;
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment intent not found: {0}")]
    IntentNotFound(String),

    #[error("plan {0} has no price")]
    NothingToPay(String),

    #[error("payment declined: {0}")]
    Declined(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

impl From<anyhow::Error> for PaymentError {
    fn from(err: anyhow::Error) -> Self {
        PaymentError::Admission(AdmissionError::Account(err))
    }
}

/// Open a pending intent for `plan_id` at the plan's list price.
pub async fn create_payment_intent(
    admission: &AdmissionController,
    accounts: &dyn AccountStore,
    user_id: &str,
    plan_id: &str,
) -> Result<PaymentIntent, PaymentError> {
    let plan = plan::require_plan(plan_id).map_err(AdmissionError::from)?;
    if plan.is_free() {
        return Err(PaymentError::NothingToPay(plan.id.to_string()));
    }

    let intent = accounts
        .create_payment_intent(NewPaymentIntent {
            user_id: user_id.to_string(),
            plan_id: plan.id.to_string(),
            amount_minor_units: plan.price_minor_units,
            currency: PLAN_CURRENCY.to_string(),
        })
        .await?;
    info!(user_id, intent_id = %intent.id, plan_id = plan.id, "Payment intent created");
    admission
        .advance_pending(
            user_id,
            &[
                UploadPhase::Denied,
                UploadPhase::PlanSelection,
                UploadPhase::Paying,
            ],
        )
        .await;
    Ok(intent)
}

/// Settle and confirm an intent owned by `user_id`, then return the account.
///
/// Confirming an already-confirmed intent is a no-op that returns the
/// current account. A declined payment leaves the intent pending.
///
/// The user's lock is held from the status read through the plan write, so
/// concurrent confirmations of one intent settle it once.
pub async fn confirm_payment(
    admission: &AdmissionController,
    accounts: &dyn AccountStore,
    gateway: &dyn PaymentGateway,
    user_id: &str,
    intent_id: &str,
) -> Result<UserAccount, PaymentError> {
    let guard = admission.lock_user(user_id).await;

    let intent = accounts
        .get_payment_intent(intent_id)
        .await?
        .filter(|i| i.user_id == user_id)
        .ok_or_else(|| PaymentError::IntentNotFound(intent_id.to_string()))?;

    if intent.status == PaymentStatus::Confirmed {
        return Ok(admission.account(user_id).await?);
    }

    if let PaymentOutcome::Declined(reason) = gateway.settle(&intent).await {
        warn!(user_id, intent_id, reason = %reason, "Payment declined");
        admission
            .advance_pending(user_id, &[UploadPhase::PayFailed])
            .await;
        return Err(PaymentError::Declined(reason));
    }

    Ok(admission.apply_confirmed_intent(&guard, &intent.id).await?)
}
