use serde::Serialize;

use crate::error::CoreError;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Plan assigned to accounts that never bought one.
pub const FREE_PLAN_ID: &str = "basic";

/// ISO 4217 code for `price_minor_units`.
pub const PLAN_CURRENCY: &str = "INR";

/// A storage-quota tier.
///
/// Plans are static: the table below is the single source of truth and is
/// ordered by `storage_limit_bytes` ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: &'static str,
    pub display_name: &'static str,
    pub storage_limit_bytes: u64,
    /// Price in paise.
    pub price_minor_units: u64,
    pub description: &'static str,
}

impl Plan {
    pub fn storage_limit_mb(&self) -> u64 {
        self.storage_limit_bytes / BYTES_PER_MB
    }

    pub fn is_free(&self) -> bool {
        self.price_minor_units == 0
    }
}

pub static PLANS: &[Plan] = &[
    Plan {
        id: FREE_PLAN_ID,
        display_name: "Basic",
        storage_limit_bytes: 10 * BYTES_PER_MB,
        price_minor_units: 0,
        description: "Free - 10MB Storage",
    },
    Plan {
        id: "pro-50",
        display_name: "Pro 50",
        storage_limit_bytes: 50 * BYTES_PER_MB,
        price_minor_units: 2_000,
        description: "₹20 - 50MB Storage",
    },
    Plan {
        id: "pro-100",
        display_name: "Pro 100",
        storage_limit_bytes: 100 * BYTES_PER_MB,
        price_minor_units: 5_000,
        description: "₹50 - 100MB Storage",
    },
];

pub fn find_plan(id: &str) -> Option<&'static Plan> {
    PLANS.iter().find(|p| p.id == id)
}

pub fn require_plan(id: &str) -> Result<&'static Plan, CoreError> {
    find_plan(id).ok_or_else(|| CoreError::UnknownPlan(id.to_string()))
}

pub fn free_plan() -> &'static Plan {
    &PLANS[0]
}

/// Paid plans that would raise a limit of `current_limit_bytes`.
pub fn upgrade_options(current_limit_bytes: u64) -> Vec<&'static Plan> {
    PLANS
        .iter()
        .filter(|p| !p.is_free() && p.storage_limit_bytes > current_limit_bytes)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_are_ordered_by_limit_and_free_plan_is_smallest() {
        for pair in PLANS.windows(2) {
            assert!(pair[0].storage_limit_bytes < pair[1].storage_limit_bytes);
        }
        let free: Vec<_> = PLANS.iter().filter(|p| p.is_free()).collect();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, FREE_PLAN_ID);
        assert_eq!(free_plan().id, FREE_PLAN_ID);
    }

    #[test]
    fn plan_ids_are_unique() {
        for (i, a) in PLANS.iter().enumerate() {
            assert!(PLANS[i + 1..].iter().all(|b| b.id != a.id));
        }
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(find_plan("pro-50").map(|p| p.storage_limit_mb()), Some(50));
        assert!(find_plan("enterprise").is_none());
        assert_eq!(
            require_plan("gold"),
            Err(CoreError::UnknownPlan("gold".to_string()))
        );
    }

    #[test]
    fn upgrade_options_skip_free_and_smaller_plans() {
        let ids: Vec<_> = upgrade_options(10 * BYTES_PER_MB)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["pro-50", "pro-100"]);

        let ids: Vec<_> = upgrade_options(50 * BYTES_PER_MB)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["pro-100"]);

        assert!(upgrade_options(100 * BYTES_PER_MB).is_empty());
    }

    #[test]
    fn plan_serializes_camel_case() {
        let v = serde_json::to_value(free_plan()).unwrap();
        assert_eq!(v["storageLimitBytes"], 10 * BYTES_PER_MB);
        assert_eq!(v["priceMinorUnits"], 0);
        assert_eq!(v["displayName"], "Basic");
    }
}
