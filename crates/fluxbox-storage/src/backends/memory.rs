//! In-process storage backend.
//!
//! Keeps objects in an ordered map and mimics S3 listing semantics
//! (prefix + delimiter grouping). Used for local runs without a bucket and
//! throughout the test suites. Presigned URLs use the `memory://` scheme and
//! cannot be fetched; they only carry the key and expiry.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::traits::{Listing, ObjectBody, ObjectStore, ObjectSummary, PresignedUrl, UploadUrlIssuer};

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    content_type: Option<String>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MemoryBackend {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    store_available: AtomicBool,
    issuer_available: AtomicBool,
}

impl MemoryBackend {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: RwLock::new(BTreeMap::new()),
            store_available: AtomicBool::new(true),
            issuer_available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage of the object store (list/put/get/delete).
    pub fn set_store_available(&self, available: bool) {
        self.store_available.store(available, Ordering::SeqCst);
    }

    /// Simulate an outage of the presigned-URL issuer.
    pub fn set_issuer_available(&self, available: bool) {
        self.issuer_available.store(available, Ordering::SeqCst);
    }

    /// Number of stored objects, across all prefixes.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    fn ensure_store(&self) -> StorageResult<()> {
        if self.store_available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn list(&self, prefix: &str, delimiter: Option<&str>) -> StorageResult<Listing> {
        self.ensure_store()?;
        let objects = self.objects.read().await;

        let mut listing = Listing::default();
        let mut folders = BTreeSet::new();
        for (key, obj) in objects.range(prefix.to_string()..) {
            let Some(rest) = key.strip_prefix(prefix) else {
                break;
            };
            let grouped = delimiter
                .filter(|d| !d.is_empty())
                .and_then(|d| rest.find(d).map(|idx| idx + d.len()));
            match grouped {
                Some(end) => {
                    folders.insert(format!("{prefix}{}", &rest[..end]));
                }
                None => listing.objects.push(ObjectSummary {
                    key: key.clone(),
                    size: obj.data.len() as u64,
                    last_modified: Some(obj.last_modified),
                }),
            }
        }
        listing.common_prefixes = folders.into_iter().collect();
        Ok(listing)
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()> {
        self.ensure_store()?;
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.map(str::to_string),
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_stream(&self, key: &str) -> StorageResult<ObjectBody> {
        self.ensure_store()?;
        let obj = self
            .objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let content_length = Some(obj.data.len() as u64);
        let data = obj.data;
        Ok(ObjectBody {
            content_type: obj.content_type,
            content_length,
            stream: Box::pin(futures::stream::once(async move { Ok::<_, StorageError>(data) })),
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.ensure_store()?;
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.ensure_store()
    }
}

#[async_trait]
impl UploadUrlIssuer for MemoryBackend {
    async fn presign_put(
        &self,
        key: &str,
        _content_type: Option<&str>,
        expires_in: Duration,
    ) -> StorageResult<PresignedUrl> {
        if !self.issuer_available.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory issuer offline".to_string()));
        }
        let ttl = chrono::Duration::from_std(expires_in)
            .map_err(|e| StorageError::Presign(e.to_string()))?;
        Ok(PresignedUrl {
            url: format!(
                "memory://{}/{}?X-Expires={}",
                self.bucket,
                key,
                expires_in.as_secs()
            ),
            expires_at: Utc::now() + ttl,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn seeded() -> MemoryBackend {
        let store = MemoryBackend::new("fluxbox");
        for (key, body) in [
            ("alice/a.txt", "aaa"),
            ("alice/docs/", ""),
            ("alice/docs/b.txt", "bbbb"),
            ("alice/docs/deep/c.txt", "c"),
            ("alice2/x.txt", "xx"),
            ("bob/y.txt", "y"),
        ] {
            store
                .put(key, Bytes::from(body), None)
                .await
                .expect("seed put");
        }
        store
    }

    #[tokio::test]
    async fn delimiter_groups_folders() {
        let store = seeded().await;
        let listing = store.list("alice/", Some("/")).await.unwrap();
        let keys: Vec<_> = listing.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["alice/a.txt"]);
        assert_eq!(listing.common_prefixes, vec!["alice/docs/".to_string()]);

        let listing = store.list("alice/docs/", Some("/")).await.unwrap();
        let keys: Vec<_> = listing.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["alice/docs/", "alice/docs/b.txt"]);
        assert_eq!(listing.common_prefixes, vec!["alice/docs/deep/".to_string()]);
    }

    #[tokio::test]
    async fn flat_listing_stays_inside_prefix() {
        let store = seeded().await;
        let listing = store.list("alice/", None).await.unwrap();
        assert_eq!(listing.objects.len(), 4);
        assert!(listing.objects.iter().all(|o| o.key.starts_with("alice/")));
        let total: u64 = listing.objects.iter().map(|o| o.size).sum();
        assert_eq!(total, 8);
    }

    #[tokio::test]
    async fn get_missing_is_not_found_and_delete_is_idempotent() {
        let store = seeded().await;
        assert!(matches!(
            store.get_stream("alice/nope").await,
            Err(StorageError::NotFound(_))
        ));
        store.delete("alice/nope").await.unwrap();
        store.delete("alice/a.txt").await.unwrap();
        store.delete("alice/a.txt").await.unwrap();
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn get_stream_yields_body() {
        let store = seeded().await;
        store
            .put("bob/z.json", Bytes::from_static(b"{}"), Some("application/json"))
            .await
            .unwrap();
        let mut body = store.get_stream("bob/z.json").await.unwrap();
        assert_eq!(body.content_type.as_deref(), Some("application/json"));
        assert_eq!(body.content_length, Some(2));
        let chunk = body.stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"{}");
        assert!(body.stream.next().await.is_none());
    }

    #[tokio::test]
    async fn outage_switches() {
        let store = seeded().await;
        store.set_store_available(false);
        assert!(matches!(
            store.list("alice/", None).await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.health_check().await.is_err());
        store.set_store_available(true);

        store.set_issuer_available(false);
        assert!(store
            .presign_put("alice/n.txt", None, Duration::from_secs(60))
            .await
            .is_err());
        store.set_issuer_available(true);
        let url = store
            .presign_put("alice/n.txt", None, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url.url, "memory://fluxbox/alice/n.txt?X-Expires=60");
    }
}
