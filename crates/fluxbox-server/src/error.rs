use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use fluxbox_core::error::CoreError;
use fluxbox_storage::StorageError;

use crate::admission::AdmissionError;
use crate::payments::PaymentError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    /// Upload refused because it would push the user past their plan limit.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", msg.clone())
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Unauthorized".to_string(),
            ),
            AppError::QuotaExceeded(msg) => {
                (StatusCode::FORBIDDEN, "quota_exceeded", msg.clone())
            }
            AppError::UnknownPlan(plan_id) => (
                StatusCode::BAD_REQUEST,
                "unknown_plan",
                format!("Unknown plan: {plan_id}"),
            ),
            AppError::PaymentDeclined(reason) => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_declined",
                format!("Payment declined: {reason}"),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": null
                }
            })),
        )
            .into_response()
    }
}

impl From<AdmissionError> for AppError {
    fn from(err: AdmissionError) -> Self {
        match err {
            AdmissionError::InvalidInput(msg) => AppError::BadRequest(msg),
            AdmissionError::QuotaExceeded(decision)
            | AdmissionError::PendingStillDenied(decision) => {
                AppError::QuotaExceeded(decision.denial_message())
            }
            AdmissionError::UnknownPlan(plan_id) => AppError::UnknownPlan(plan_id),
            AdmissionError::NoPendingUpload => {
                AppError::NotFound("No pending upload".to_string())
            }
            e @ (AdmissionError::StoreUnavailable(_) | AdmissionError::IssuerUnavailable(_)) => {
                AppError::Internal(anyhow::Error::new(e))
            }
            AdmissionError::Account(e) => AppError::Internal(e),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidKey(msg) => AppError::BadRequest(msg),
            CoreError::UnknownPlan(plan_id) => AppError::UnknownPlan(plan_id),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            StorageError::InvalidKey(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::IntentNotFound(id) => {
                AppError::NotFound(format!("Payment intent not found: {id}"))
            }
            PaymentError::NothingToPay(plan_id) => {
                AppError::BadRequest(format!("Plan {plan_id} is free; nothing to pay"))
            }
            PaymentError::Declined(reason) => AppError::PaymentDeclined(reason),
            PaymentError::Admission(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxbox_core::quota::Decision;

    #[test]
    fn admission_errors_map_to_statuses() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (
                AdmissionError::InvalidInput("bad".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AdmissionError::QuotaExceeded(Decision::evaluate(8, 0, 3, 10)).into(),
                StatusCode::FORBIDDEN,
            ),
            (
                AdmissionError::UnknownPlan("gold".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (AdmissionError::NoPendingUpload.into(), StatusCode::NOT_FOUND),
            (
                AdmissionError::Account(anyhow::anyhow!("db gone")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                PaymentError::Declined("card".into()).into(),
                StatusCode::PAYMENT_REQUIRED,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
