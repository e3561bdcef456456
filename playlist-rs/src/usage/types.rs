use serde::{Deserialize, Serialize};

/// Bytes per megabyte as reported to clients
pub const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Megabytes granted per quota unit
pub const MEGABYTES_PER_QUOTA_UNIT: u64 = 1000;

/// Aggregate usage of one storage namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Entries listed from the audio directory plus every blob
    pub item_count: u64,
    /// Sum of file and blob sizes
    pub total_bytes: u64,
    pub quota_units: u32,
}

impl UsageSummary {
    pub fn empty(quota_units: u32) -> Self {
        Self {
            item_count: 0,
            total_bytes: 0,
            quota_units,
        }
    }

    /// Whole megabytes used, rounded down
    pub fn used_megabytes(&self) -> u64 {
        self.total_bytes / BYTES_PER_MEGABYTE
    }

    /// Quota expressed in megabytes
    pub fn quota_megabytes(&self) -> u64 {
        u64::from(self.quota_units) * MEGABYTES_PER_QUOTA_UNIT
    }

    pub fn usage_percent(&self) -> f64 {
        let quota_bytes = self.quota_megabytes() * BYTES_PER_MEGABYTE;
        if quota_bytes == 0 {
            return 0.0;
        }
        (self.total_bytes as f64 / quota_bytes as f64) * 100.0
    }
}

/// Which store a traversal covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    FileShare,
    BlobContainer,
}

/// Why a traversal stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The share, directory or container lookup itself failed
    ExistenceCheck,
    /// A listing page request failed
    PageFetch,
    TimedOut,
    Cancelled,
}

/// A traversal that ended before the listing was exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFailure {
    pub store: StoreKind,
    pub kind: FailureKind,
    /// Pages fully counted before the failure
    pub pages_read: u64,
    pub message: String,
}

/// Result of a usage computation.
///
/// `Partial` still carries every entry counted before a traversal stopped,
/// so its totals are a lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsageReport {
    Complete(UsageSummary),
    Partial {
        summary: UsageSummary,
        failures: Vec<StoreFailure>,
    },
}

impl UsageReport {
    pub fn summary(&self) -> &UsageSummary {
        match self {
            UsageReport::Complete(summary) => summary,
            UsageReport::Partial { summary, .. } => summary,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, UsageReport::Complete(_))
    }

    pub fn failures(&self) -> &[StoreFailure] {
        match self {
            UsageReport::Complete(_) => &[],
            UsageReport::Partial { failures, .. } => failures,
        }
    }
}
