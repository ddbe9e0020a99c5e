//! Quota-gated upload admission.
//!
//! The controller decides whether an upload may proceed, issues presigned
//! upload targets, applies plan changes and keeps the single pending upload
//! a user can resolve after upgrading.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use fluxbox_core::{
    error::CoreError,
    object_key,
    plan::{self, Plan},
    quota::{Decision, StorageUsageSnapshot},
};
use fluxbox_storage::{Listing, ObjectStore, StorageError, UploadUrlIssuer};

use crate::accounts::{AccountStore, UserAccount};

pub mod pending;
pub mod reservations;

pub use pending::{PendingUpload, UploadPhase};
pub use reservations::ReservationLedger;

/// Hours a denied upload waits for a plan upgrade before it is forgotten.
pub const PENDING_UPLOAD_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{}", .0.denial_message())]
    QuotaExceeded(Decision),

    #[error("object store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    #[error("upload URL issuer unavailable: {0}")]
    IssuerUnavailable(#[source] StorageError),

    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    #[error("no pending upload")]
    NoPendingUpload,

    #[error("{}", .0.denial_message())]
    PendingStillDenied(Decision),

    #[error("account store error: {0}")]
    Account(#[from] anyhow::Error),
}

impl From<CoreError> for AdmissionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidKey(msg) => AdmissionError::InvalidInput(msg),
            CoreError::UnknownPlan(id) => AdmissionError::UnknownPlan(id),
        }
    }
}

/// One requested upload, as the client describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub relative_path: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// Where and until when the client may PUT the file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    pub url: String,
    /// Relative key (no user prefix).
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Holds the per-user lock. Plan and intent writes that must not interleave
/// with admissions take one of these first.
pub struct UserGuard {
    user_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl UserGuard {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

pub struct AdmissionController {
    accounts: Arc<dyn AccountStore>,
    store: Arc<dyn ObjectStore>,
    issuer: Arc<dyn UploadUrlIssuer>,
    url_ttl: Duration,
    strict: bool,
    reservations: ReservationLedger,
    pending: Mutex<HashMap<String, PendingUpload>>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AdmissionController {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        store: Arc<dyn ObjectStore>,
        issuer: Arc<dyn UploadUrlIssuer>,
        url_ttl: Duration,
        strict: bool,
    ) -> Self {
        Self {
            accounts,
            store,
            issuer,
            url_ttl,
            strict,
            reservations: ReservationLedger::new(),
            pending: Mutex::new(HashMap::new()),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Per-user lock serializing check+reserve, plan changes and payment
    /// confirmation.
    pub async fn lock_user(&self, user_id: &str) -> UserGuard {
        let lock = {
            let mut locks = self.user_locks.lock().await;
            Arc::clone(locks.entry(user_id.to_string()).or_default())
        };
        UserGuard {
            user_id: user_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Current account. Users with no stored plan are on the free plan.
    pub async fn account(&self, user_id: &str) -> Result<UserAccount, AdmissionError> {
        let plan = match self.accounts.get_user_plan(user_id).await? {
            None => plan::free_plan(),
            Some(plan_id) => match plan::find_plan(&plan_id) {
                Some(plan) => plan,
                None => {
                    warn!(user_id, plan_id = %plan_id, "Stored plan is unknown, using free plan");
                    plan::free_plan()
                }
            },
        };
        Ok(UserAccount::on_plan(user_id, plan))
    }

    async fn list_all(&self, user_id: &str) -> Result<Listing, AdmissionError> {
        self.store
            .list(&object_key::user_prefix(user_id), None)
            .await
            .map_err(AdmissionError::StoreUnavailable)
    }

    /// Sum and count of every object under the user's prefix.
    pub async fn usage(&self, user_id: &str) -> Result<StorageUsageSnapshot, AdmissionError> {
        let listing = self.list_all(user_id).await?;
        Ok(StorageUsageSnapshot::from_sizes(
            listing.objects.iter().map(|o| o.size),
        ))
    }

    /// Would `candidate_size_bytes` more fit in the user's plan?
    ///
    /// A listing failure is reported as `StoreUnavailable`; no decision is
    /// made without a usage figure.
    pub async fn check_quota(
        &self,
        user_id: &str,
        candidate_size_bytes: u64,
    ) -> Result<Decision, AdmissionError> {
        let account = self.account(user_id).await?;
        let listing = self.list_all(user_id).await?;
        let usage = StorageUsageSnapshot::from_sizes(listing.objects.iter().map(|o| o.size));

        let reserved = if self.strict {
            let listed: HashMap<&str, DateTime<Utc>> = listing
                .objects
                .iter()
                .filter_map(|o| o.last_modified.map(|t| (o.key.as_str(), t)))
                .collect();
            self.reservations
                .outstanding(user_id, &listed, Utc::now())
                .await
        } else {
            0
        };

        let decision = Decision::evaluate(
            usage.total_bytes,
            reserved,
            candidate_size_bytes,
            account.storage_limit_bytes,
        );
        debug!(
            user_id,
            allowed = decision.allowed,
            current = decision.current_usage_bytes,
            reserved = decision.reserved_bytes,
            limit = decision.limit_bytes,
            "Quota checked"
        );
        Ok(decision)
    }

    /// Presign a PUT for the request's key. Does not check quota.
    pub async fn issue_upload_target(
        &self,
        user_id: &str,
        request: &UploadRequest,
    ) -> Result<UploadTarget, AdmissionError> {
        let key = object_key::add_prefix(user_id, &request.relative_path)?;
        let issued_at = Utc::now();
        let presigned = self
            .issuer
            .presign_put(&key, request.content_type.as_deref(), self.url_ttl)
            .await
            .map_err(AdmissionError::IssuerUnavailable)?;

        if self.strict {
            self.reservations
                .reserve(
                    user_id,
                    &key,
                    request.size_bytes,
                    issued_at,
                    presigned.expires_at,
                )
                .await;
        }

        info!(user_id, key = %key, size = request.size_bytes, "Upload target issued");
        Ok(UploadTarget {
            url: presigned.url,
            key: request.relative_path.clone(),
            expires_at: presigned.expires_at,
        })
    }

    /// Check quota and, when allowed, issue the upload target.
    ///
    /// A denial is remembered as the user's pending upload (replacing any
    /// earlier one) and returned as `QuotaExceeded`.
    pub async fn admit_upload(
        &self,
        user_id: &str,
        request: UploadRequest,
    ) -> Result<UploadTarget, AdmissionError> {
        object_key::validate_relative_path(&request.relative_path, false)?;

        let _guard = self.lock_user(user_id).await;

        let decision = self.check_quota(user_id, request.size_bytes).await?;
        if !decision.allowed {
            info!(
                user_id,
                key = %request.relative_path,
                size = request.size_bytes,
                "Upload denied by quota"
            );
            self.pending.lock().await.insert(
                user_id.to_string(),
                PendingUpload {
                    relative_path: request.relative_path,
                    size_bytes: request.size_bytes,
                    content_type: request.content_type,
                    phase: UploadPhase::Denied,
                    created_at: Utc::now(),
                },
            );
            return Err(AdmissionError::QuotaExceeded(decision));
        }

        self.issue_upload_target(user_id, &request).await
    }

    /// The client reports the PUT finished; its reservation is released.
    pub async fn complete_upload(
        &self,
        user_id: &str,
        relative_path: &str,
    ) -> Result<bool, AdmissionError> {
        let key = object_key::add_prefix(user_id, relative_path)?;
        Ok(self.reservations.release(user_id, &key).await)
    }

    /// Move the user onto `plan_id`. Unknown plans leave the account as is.
    pub async fn apply_plan(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<UserAccount, AdmissionError> {
        let plan: &Plan = plan::require_plan(plan_id)?;

        let _guard = self.lock_user(user_id).await;

        self.accounts.set_user_plan(user_id, plan.id).await?;
        info!(user_id, plan_id = plan.id, "Plan applied");
        Ok(UserAccount::on_plan(user_id, plan))
    }

    /// Confirm a settled payment intent; its plan is granted by the account
    /// store in the same write. Replays leave the account untouched.
    ///
    /// The caller must already hold the user's lock.
    pub async fn apply_confirmed_intent(
        &self,
        guard: &UserGuard,
        intent_id: &str,
    ) -> Result<UserAccount, AdmissionError> {
        let user_id = guard.user_id();
        if self.accounts.confirm_payment_intent(intent_id).await? {
            self.advance_pending(user_id, &[UploadPhase::Applied]).await;
        } else {
            debug!(user_id, intent_id, "Intent already confirmed");
        }
        self.account(user_id).await
    }

    /// Walk the pending upload's phase along `steps`.
    ///
    /// A step equal to the current phase is skipped; the walk stops at the
    /// first step the current phase cannot move to. Returns the phase reached,
    /// or `None` when the user has no pending upload.
    pub async fn advance_pending(
        &self,
        user_id: &str,
        steps: &[UploadPhase],
    ) -> Option<UploadPhase> {
        let mut pending = self.pending.lock().await;
        let slot = pending.get_mut(user_id)?;
        for &next in steps {
            if slot.phase == next {
                continue;
            }
            if !slot.phase.can_transition_to(next) {
                debug!(user_id, from = ?slot.phase, to = ?next, "Pending phase step skipped");
                break;
            }
            slot.phase = next;
        }
        Some(slot.phase)
    }

    pub async fn pending_upload(&self, user_id: &str) -> Option<PendingUpload> {
        self.pending.lock().await.get(user_id).cloned()
    }

    /// Discard the pending upload. Returns whether there was one.
    pub async fn cancel_pending_upload(&self, user_id: &str) -> bool {
        self.pending.lock().await.remove(user_id).is_some()
    }

    /// Retry the pending upload against the user's current plan.
    ///
    /// On success the slot is cleared and a target is returned. If it still
    /// does not fit, the slot is kept so the user can pick a larger plan.
    pub async fn resolve_pending_upload(
        &self,
        user_id: &str,
    ) -> Result<UploadTarget, AdmissionError> {
        let _guard = self.lock_user(user_id).await;

        let pending = self
            .pending_upload(user_id)
            .await
            .ok_or(AdmissionError::NoPendingUpload)?;

        let decision = self.check_quota(user_id, pending.size_bytes).await?;
        if !decision.allowed {
            info!(user_id, size = pending.size_bytes, "Pending upload still denied");
            self.advance_pending(user_id, &[UploadPhase::Checking, UploadPhase::Denied])
                .await;
            return Err(AdmissionError::PendingStillDenied(decision));
        }

        let target = self
            .issue_upload_target(
                user_id,
                &UploadRequest {
                    relative_path: pending.relative_path,
                    content_type: pending.content_type,
                    size_bytes: pending.size_bytes,
                },
            )
            .await?;
        self.pending.lock().await.remove(user_id);
        Ok(target)
    }

    /// Drop expired reservations, stale pending uploads and idle per-user
    /// locks.
    pub async fn purge_expired(&self) -> PurgeReport {
        self.purge_expired_at(Utc::now()).await
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> PurgeReport {
        let reservations = self.reservations.purge_expired(now).await;

        let pending_uploads = {
            let mut pending = self.pending.lock().await;
            let ttl = chrono::Duration::hours(PENDING_UPLOAD_TTL_HOURS);
            let before = pending.len();
            pending.retain(|_, p| p.created_at + ttl > now);
            before - pending.len()
        };

        self.user_locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        PurgeReport {
            reservations,
            pending_uploads,
        }
    }

    /// Background loop: purge expired state once a minute.
    pub async fn run_reservation_purge_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let report = self.purge_expired().await;
            if report.reservations > 0 || report.pending_uploads > 0 {
                info!(
                    reservations = report.reservations,
                    pending_uploads = report.pending_uploads,
                    "Expired upload state purged"
                );
            }
        }
    }
}

/// What one purge pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub reservations: usize,
    pub pending_uploads: usize,
}
