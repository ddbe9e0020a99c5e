//! Per-user object key prefixing.
//!
//! Every key in the bucket has the form `<userId>/<relativePath>`. Clients
//! only ever see `<relativePath>`; the helpers here are the one place where
//! the prefix is added or removed, so both directions stay symmetric.

use crate::error::CoreError;

/// `"<userId>/"`.
pub fn user_prefix(user_id: &str) -> String {
    format!("{user_id}/")
}

/// Reject relative paths that could step outside the caller's prefix.
///
/// `allow_empty` is used for listing prefixes where `""` means the root.
pub fn validate_relative_path(path: &str, allow_empty: bool) -> Result<(), CoreError> {
    if path.is_empty() {
        return if allow_empty {
            Ok(())
        } else {
            Err(CoreError::InvalidKey("key must not be empty".to_string()))
        };
    }
    if path.starts_with('/') {
        return Err(CoreError::InvalidKey(format!(
            "key must be relative: {path}"
        )));
    }
    if path.chars().any(char::is_control) {
        return Err(CoreError::InvalidKey(
            "key contains control characters".to_string(),
        ));
    }
    let body = path.strip_suffix('/').unwrap_or(path);
    for segment in body.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(CoreError::InvalidKey(format!(
                "invalid path segment in key: {path}"
            )));
        }
    }
    Ok(())
}

pub fn add_prefix(user_id: &str, relative_path: &str) -> Result<String, CoreError> {
    validate_relative_path(relative_path, false)?;
    Ok(format!("{user_id}/{relative_path}"))
}

/// Prefix a listing path; `""` lists the user's root.
pub fn add_listing_prefix(user_id: &str, relative_prefix: &str) -> Result<String, CoreError> {
    validate_relative_path(relative_prefix, true)?;
    Ok(format!("{user_id}/{relative_prefix}"))
}

/// Remove the user prefix from a full key.
///
/// Returns `None` when the key does not belong to `user_id`, including the
/// case where another user's id merely starts with the same characters.
pub fn strip_prefix(user_id: &str, key: &str) -> Option<String> {
    key.strip_prefix(user_id)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}

/// A trailing `/` marks a zero-byte folder placeholder.
pub fn is_folder(key: &str) -> bool {
    key.ends_with('/')
}

/// Last non-empty path segment, used as the download file name.
pub fn basename(key: &str) -> &str {
    key.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("download")
}

/// Relative key of a folder placeholder: `<parentPath><folderName>/`.
///
/// `parent_path` is either empty (root) or itself a folder path ending in
/// `/`; a missing trailing slash is added.
pub fn folder_key(parent_path: &str, folder_name: &str) -> Result<String, CoreError> {
    let name = folder_name.trim_end_matches('/');
    if name.is_empty() || name.contains('/') {
        return Err(CoreError::InvalidKey(format!(
            "invalid folder name: {folder_name}"
        )));
    }
    let key = match parent_path {
        "" => format!("{name}/"),
        p if p.ends_with('/') => format!("{p}{name}/"),
        p => format!("{p}/{name}/"),
    };
    validate_relative_path(&key, false)?;
    Ok(key)
}
