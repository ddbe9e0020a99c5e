//! Storage trait definitions.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::StorageResult;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// One leaf object returned by a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of a prefix listing.
///
/// With a delimiter, keys that contain the delimiter after the prefix are
/// folded into `common_prefixes` (one entry per "folder") instead of being
/// returned in `objects`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    pub objects: Vec<ObjectSummary>,
    pub common_prefixes: Vec<String>,
}

/// A readable object body.
pub struct ObjectBody {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectBody")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// A time-limited URL authorizing a single PUT to one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Flat key/value byte store with prefix listing.
///
/// Keys passed here are full bucket keys; per-user prefixing happens in the
/// caller.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// List every object under `prefix`, following continuation tokens.
    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> StorageResult<Listing>;

    /// Put an object, replacing any existing one.
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()>;

    /// Open an object for streaming. Missing keys yield `StorageError::NotFound`.
    async fn get_stream(&self, key: &str) -> StorageResult<ObjectBody>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Get the name of this storage backend (e.g. "s3", "memory").
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Issues presigned upload URLs so file bytes never pass through the server.
#[async_trait]
pub trait UploadUrlIssuer: Send + Sync + 'static {
    async fn presign_put(
        &self,
        key: &str,
        content_type: Option<&str>,
        expires_in: Duration,
    ) -> StorageResult<PresignedUrl>;
}
