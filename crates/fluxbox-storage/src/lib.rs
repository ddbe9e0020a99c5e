//! Object storage abstraction and backends for Fluxbox.
//!
//! This crate provides:
//! - The `ObjectStore` trait (list / put / get / delete over full bucket keys)
//! - The `UploadUrlIssuer` trait for presigned direct uploads
//! - Backends: S3-compatible and in-memory

pub mod backends;
pub mod error;
pub mod traits;

use std::sync::Arc;

use fluxbox_core::config::StorageConfig;

pub use backends::{memory::MemoryBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use traits::{
    ByteStream, Listing, ObjectBody, ObjectStore, ObjectSummary, PresignedUrl, UploadUrlIssuer,
};

/// A backend viewed through both of its capabilities.
#[derive(Clone)]
pub struct StorageHandles {
    pub store: Arc<dyn ObjectStore>,
    pub issuer: Arc<dyn UploadUrlIssuer>,
}

impl StorageHandles {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ObjectStore + UploadUrlIssuer,
    {
        Self {
            store: backend.clone(),
            issuer: backend,
        }
    }
}

/// Create storage handles from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<StorageHandles> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Memory { bucket } => {
            Ok(StorageHandles::from_backend(Arc::new(MemoryBackend::new(bucket))))
        }
        StorageConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                bucket,
                region,
                endpoint.as_deref(),
                access_key_id.as_deref(),
                secret_access_key.as_deref(),
                *force_path_style,
            )
            .await?;
            Ok(StorageHandles::from_backend(Arc::new(backend)))
        }
    }
}
