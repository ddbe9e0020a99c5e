use serde::Serialize;

use crate::plan::BYTES_PER_MB;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

/// Totals of every live object under a user's prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsageSnapshot {
    pub total_bytes: u64,
    pub file_count: u64,
}

impl StorageUsageSnapshot {
    pub fn from_sizes<I: IntoIterator<Item = u64>>(sizes: I) -> Self {
        sizes
            .into_iter()
            .fold(Self::default(), |acc, size| Self {
                total_bytes: acc.total_bytes.saturating_add(size),
                file_count: acc.file_count + 1,
            })
    }

    /// Usage in MB rounded to two decimal places.
    pub fn total_mb(&self) -> f64 {
        (bytes_to_mb(self.total_bytes) * 100.0).round() / 100.0
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allowed: bool,
    pub current_usage_bytes: u64,
    /// Bytes promised to issued upload URLs that have not landed yet.
    pub reserved_bytes: u64,
    pub limit_bytes: u64,
    pub projected_bytes: u64,
}

impl Decision {
    /// The limit is inclusive: `projected == limit` is allowed. A sum that
    /// overflows `u64` is denied and reported as `u64::MAX`.
    pub fn evaluate(current: u64, reserved: u64, candidate: u64, limit: u64) -> Self {
        let projected = current
            .checked_add(reserved)
            .and_then(|v| v.checked_add(candidate));
        Self {
            allowed: projected.is_some_and(|p| p <= limit),
            current_usage_bytes: current,
            reserved_bytes: reserved,
            limit_bytes: limit,
            projected_bytes: projected.unwrap_or(u64::MAX),
        }
    }

    pub fn denial_message(&self) -> String {
        format!(
            "Storage limit exceeded. You have used {:.2} MB. Maximum allowed is {:.0} MB.",
            bytes_to_mb(self.current_usage_bytes.saturating_add(self.reserved_bytes)),
            bytes_to_mb(self.limit_bytes),
        )
    }
}
