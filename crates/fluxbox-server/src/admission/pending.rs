use chrono::{DateTime, Utc};
use serde::Serialize;

/// An upload that was refused for quota and is waiting on a plan upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpload {
    pub relative_path: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    /// Where the upgrade flow for this upload has got to.
    pub phase: UploadPhase,
    pub created_at: DateTime<Utc>,
}

/// Client-side phases of one upload attempt.
///
/// ```text
/// Idle -> Checking -> Allowed -> Uploading -> Done
///                  -> Denied -> PlanSelection -> Paying -> Applied -> Checking
///                                                      -> PayFailed -> Denied
/// Denied | PlanSelection -> Cancelled
/// ```
///
/// `Done`, `PayFailed` and `Cancelled` end an attempt. A failed payment may
/// be retried by hand, which re-enters at `Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadPhase {
    Idle,
    Checking,
    Allowed,
    Uploading,
    Done,
    Denied,
    PlanSelection,
    Paying,
    Applied,
    PayFailed,
    Cancelled,
}

impl UploadPhase {
    pub fn can_transition_to(self, next: UploadPhase) -> bool {
        use UploadPhase::*;
        matches!(
            (self, next),
            (Idle, Checking)
                | (Checking, Allowed)
                | (Checking, Denied)
                | (Allowed, Uploading)
                | (Uploading, Done)
                | (Denied, PlanSelection)
                | (Denied, Cancelled)
                | (PlanSelection, Paying)
                | (PlanSelection, Cancelled)
                | (Paying, Applied)
                | (Paying, PayFailed)
                | (Applied, Checking)
                | (PayFailed, Denied)
                | (Done, Idle)
                | (Cancelled, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::UploadPhase::*;
    use super::*;

    #[test]
    fn upgrade_path_is_legal() {
        let path = [
            Idle,
            Checking,
            Denied,
            PlanSelection,
            Paying,
            Applied,
            Checking,
            Allowed,
            Uploading,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{:?} -> {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn shortcuts_are_rejected() {
        assert!(!Denied.can_transition_to(Allowed));
        assert!(!Idle.can_transition_to(Uploading));
        assert!(!Paying.can_transition_to(Uploading));
        assert!(!Done.can_transition_to(Checking));
        assert!(!PayFailed.can_transition_to(Paying));
        assert!(PayFailed.can_transition_to(Denied));
    }

    #[test]
    fn phases_serialize_camel_case() {
        assert_eq!(
            serde_json::to_value(PlanSelection).expect("json"),
            "planSelection"
        );
    }
}
