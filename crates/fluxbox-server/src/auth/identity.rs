use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use fluxbox_core::config::AuthMode;

use crate::{auth::jwt::decode_jwt, error::AppError, state::AppState};

/// Cookie carrying the session token when no Authorization header is sent.
pub const SESSION_COOKIE: &str = "__session";

/// The authenticated caller, resolved once per request.
///
/// `FromRequestParts` rejects with `401` when no identity can be resolved,
/// when the token fails verification, or when the user id is unusable as a
/// key prefix (empty or containing `/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = match &state.config.auth_mode {
            AuthMode::Jwt(secret) => {
                let token = bearer_token(parts)
                    .or_else(|| session_cookie(parts))
                    .ok_or(AppError::Unauthorized)?;
                decode_jwt(&token, secret)
                    .map_err(|e| {
                        tracing::debug!(error = %e, "Rejected identity token");
                        AppError::Unauthorized
                    })?
                    .sub
            }
            AuthMode::TrustedHeader(header) => parts
                .headers
                .get(header.as_str())
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .ok_or(AppError::Unauthorized)?,
        };

        if user_id.is_empty() || user_id.contains('/') {
            tracing::warn!(user_id = %user_id, "Rejected unusable user id");
            return Err(AppError::Unauthorized);
        }
        Ok(Identity { user_id })
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn session_cookie(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
