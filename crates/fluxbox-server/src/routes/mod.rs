pub mod account;
pub mod delete;
pub mod download;
pub mod folder;
pub mod health;
pub mod objects;
pub mod payments;
pub mod plans;
pub mod upload;
pub mod usage;

use crate::error::AppError;

/// Treat a missing or blank parameter as absent, with `message` as the 400.
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}
