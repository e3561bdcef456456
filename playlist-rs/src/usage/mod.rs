/// Storage usage accounting
///
/// This module provides:
/// - Usage summaries (item count, bytes, quota) per storage namespace
/// - Explicit partial results when a traversal stops early

pub mod reporter;
pub mod types;

pub use reporter::{ReporterSettings, StorageUsageReporter};
pub use types::{FailureKind, StoreFailure, StoreKind, UsageReport, UsageSummary};
