//! Storage usage reporter
//!
//! Walks a namespace's file share (one directory level under the audio
//! directory) and its blob container, counting entries and summing sizes.
//!
//! A store that was never provisioned contributes nothing and is not an
//! error. A traversal that stops early (failed page, failed lookup, timeout,
//! cancellation) keeps what it counted and marks the report `Partial`.

use crate::config::StorageConfig;
use crate::storage::paging::{blob_pages, file_pages, PageStream};
use crate::storage::{BlobContainerStore, FileShareStore, StorageNamespace};
use crate::usage::types::{
    FailureKind, StoreFailure, StoreKind, UsageReport, UsageSummary,
};
use futures::StreamExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reporter tuning
#[derive(Debug, Clone)]
pub struct ReporterSettings {
    pub quota_units: u32,
    /// Directory of the file share that holds uploaded audio
    pub audio_directory: String,
    pub traversal_timeout: Option<Duration>,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            quota_units: 10,
            audio_directory: "audio".to_string(),
            traversal_timeout: None,
        }
    }
}

impl From<&StorageConfig> for ReporterSettings {
    fn from(config: &StorageConfig) -> Self {
        Self {
            quota_units: config.quota_units,
            audio_directory: config.audio_directory.clone(),
            traversal_timeout: config.traversal_timeout(),
        }
    }
}

/// Counts accumulated for one store
#[derive(Debug, Default)]
struct StoreTally {
    items: u64,
    bytes: u64,
    pages: u64,
    failure: Option<StoreFailure>,
}

impl StoreTally {
    fn stop(&mut self, store: StoreKind, kind: FailureKind, message: String) {
        warn!(
            "Usage traversal of {:?} stopped after {} pages ({:?}): {}",
            store, self.pages, kind, message
        );
        self.failure = Some(StoreFailure {
            store,
            kind,
            pages_read: self.pages,
            message,
        });
    }

    fn failed(store: StoreKind, kind: FailureKind, message: String) -> Self {
        let mut tally = Self::default();
        tally.stop(store, kind, message);
        tally
    }
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

impl Interrupt {
    fn into_failure(self) -> (FailureKind, String) {
        match self {
            Interrupt::Cancelled => (FailureKind::Cancelled, "traversal cancelled".to_string()),
            Interrupt::TimedOut => (FailureKind::TimedOut, "traversal timed out".to_string()),
        }
    }
}

/// Computes point-in-time usage for a storage namespace
pub struct StorageUsageReporter {
    files: Arc<dyn FileShareStore>,
    blobs: Arc<dyn BlobContainerStore>,
    settings: ReporterSettings,
}

impl StorageUsageReporter {
    pub fn new(
        files: Arc<dyn FileShareStore>,
        blobs: Arc<dyn BlobContainerStore>,
        settings: ReporterSettings,
    ) -> Self {
        Self {
            files,
            blobs,
            settings,
        }
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.settings
    }

    /// Compute usage for `namespace`. Never fails; see [`UsageReport`].
    pub async fn compute_usage(&self, namespace: &StorageNamespace) -> UsageReport {
        self.compute_usage_with_cancel(namespace, &CancellationToken::new())
            .await
    }

    /// Like [`compute_usage`](Self::compute_usage), stopping both traversals
    /// once `cancel` fires
    pub async fn compute_usage_with_cancel(
        &self,
        namespace: &StorageNamespace,
        cancel: &CancellationToken,
    ) -> UsageReport {
        let deadline = self
            .settings
            .traversal_timeout
            .map(|timeout| Instant::now() + timeout);

        let (files, blobs) = tokio::join!(
            self.tally_file_share(namespace, cancel, deadline),
            self.tally_blob_container(namespace, cancel, deadline),
        );

        let summary = UsageSummary {
            item_count: files.items.saturating_add(blobs.items),
            total_bytes: files.bytes.saturating_add(blobs.bytes),
            quota_units: self.settings.quota_units,
        };

        let failures: Vec<StoreFailure> =
            files.failure.into_iter().chain(blobs.failure).collect();

        debug!(
            "Usage for {}: {} items, {} bytes ({} failures)",
            namespace,
            summary.item_count,
            summary.total_bytes,
            failures.len()
        );

        if failures.is_empty() {
            UsageReport::Complete(summary)
        } else {
            UsageReport::Partial { summary, failures }
        }
    }

    async fn tally_file_share(
        &self,
        namespace: &StorageNamespace,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> StoreTally {
        const STORE: StoreKind = StoreKind::FileShare;
        let directory = self.settings.audio_directory.as_str();

        match interruptible(self.files.share_exists(namespace), cancel, deadline).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                debug!("File share {} not provisioned", namespace);
                return StoreTally::default();
            }
            Ok(Err(e)) => return StoreTally::failed(STORE, FailureKind::ExistenceCheck, e.to_string()),
            Err(interrupt) => {
                let (kind, message) = interrupt.into_failure();
                return StoreTally::failed(STORE, kind, message);
            }
        }

        match interruptible(
            self.files.directory_exists(namespace, directory),
            cancel,
            deadline,
        )
        .await
        {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                debug!("Directory {}/{} not found", namespace, directory);
                return StoreTally::default();
            }
            Ok(Err(e)) => return StoreTally::failed(STORE, FailureKind::ExistenceCheck, e.to_string()),
            Err(interrupt) => {
                let (kind, message) = interrupt.into_failure();
                return StoreTally::failed(STORE, kind, message);
            }
        }

        let pages = file_pages(self.files.as_ref(), namespace, directory);
        drain(STORE, pages, cancel, deadline).await
    }

    async fn tally_blob_container(
        &self,
        namespace: &StorageNamespace,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> StoreTally {
        const STORE: StoreKind = StoreKind::BlobContainer;

        match interruptible(self.blobs.container_exists(namespace), cancel, deadline).await {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                debug!("Blob container {} not provisioned", namespace);
                return StoreTally::default();
            }
            Ok(Err(e)) => return StoreTally::failed(STORE, FailureKind::ExistenceCheck, e.to_string()),
            Err(interrupt) => {
                let (kind, message) = interrupt.into_failure();
                return StoreTally::failed(STORE, kind, message);
            }
        }

        let pages = blob_pages(self.blobs.as_ref(), namespace);
        drain(STORE, pages, cancel, deadline).await
    }
}

/// Consume a page stream, one page at a time
async fn drain(
    store: StoreKind,
    mut pages: PageStream<'_>,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> StoreTally {
    let mut tally = StoreTally::default();

    loop {
        let next = match interruptible(pages.next(), cancel, deadline).await {
            Ok(next) => next,
            Err(interrupt) => {
                let (kind, message) = interrupt.into_failure();
                tally.stop(store, kind, message);
                break;
            }
        };

        match next {
            None => break,
            Some(Ok(entries)) => {
                let bytes: u64 = entries.iter().map(|e| e.counted_bytes()).sum();
                tally.pages += 1;
                tally.items = tally.items.saturating_add(entries.len() as u64);
                tally.bytes = tally.bytes.saturating_add(bytes);
                debug!(
                    "{:?} page {}: {} entries, {} bytes",
                    store,
                    tally.pages,
                    entries.len(),
                    bytes
                );
            }
            Some(Err(e)) => {
                tally.stop(store, FailureKind::PageFetch, e.to_string());
                break;
            }
        }
    }

    tally
}

async fn interruptible<F: Future>(
    future: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<F::Output, Interrupt> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        _ = wait_until(deadline) => Err(Interrupt::TimedOut),
        output = future => Ok(output),
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobContainer, MemoryFileShare, StorageEntry};

    fn ns() -> StorageNamespace {
        StorageNamespace::new("user-folder").unwrap()
    }

    fn reporter(files: MemoryFileShare, blobs: MemoryBlobContainer) -> StorageUsageReporter {
        StorageUsageReporter::new(Arc::new(files), Arc::new(blobs), ReporterSettings::default())
    }

    #[tokio::test]
    async fn test_nothing_provisioned() {
        let reporter = reporter(MemoryFileShare::new(10), MemoryBlobContainer::new(10));

        let report = reporter.compute_usage(&ns()).await;
        assert_eq!(
            report,
            UsageReport::Complete(UsageSummary {
                item_count: 0,
                total_bytes: 0,
                quota_units: 10
            })
        );
    }

    #[tokio::test]
    async fn test_share_without_audio_directory_contributes_nothing() {
        let files = MemoryFileShare::new(10);
        files.create_share(&ns()).await;
        files
            .add_entries(&ns(), "other", vec![StorageEntry::file("x.mp3", 999)])
            .await;
        let blobs = MemoryBlobContainer::new(10);
        blobs.add_blobs(&ns(), vec![StorageEntry::blob("b", 5)]).await;

        let report = reporter(files, blobs).compute_usage(&ns()).await;
        assert!(report.is_complete());
        assert_eq!(report.summary().item_count, 1);
        assert_eq!(report.summary().total_bytes, 5);
    }

    #[tokio::test]
    async fn test_custom_directory_and_quota() {
        let files = MemoryFileShare::new(10);
        files
            .add_entries(&ns(), "music", vec![StorageEntry::file("x.mp3", 42)])
            .await;
        let settings = ReporterSettings {
            quota_units: 50,
            audio_directory: "music".to_string(),
            traversal_timeout: None,
        };
        let reporter = StorageUsageReporter::new(
            Arc::new(files),
            Arc::new(MemoryBlobContainer::new(10)),
            settings,
        );

        let summary = *reporter.compute_usage(&ns()).await.summary();
        assert_eq!(summary.total_bytes, 42);
        assert_eq!(summary.quota_units, 50);
    }

    #[tokio::test]
    async fn test_existence_failure_is_reported() {
        let files = MemoryFileShare::new(10).fail_existence_checks();
        let blobs = MemoryBlobContainer::new(10);
        blobs.add_blobs(&ns(), vec![StorageEntry::blob("b", 7)]).await;

        let report = reporter(files, blobs).compute_usage(&ns()).await;
        assert_eq!(report.summary().total_bytes, 7);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].store, StoreKind::FileShare);
        assert_eq!(report.failures()[0].kind, FailureKind::ExistenceCheck);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let files = MemoryFileShare::new(10);
        files
            .add_entries(&ns(), "audio", vec![StorageEntry::file("a", 1)])
            .await;
        let blobs = MemoryBlobContainer::new(10);
        blobs.create_container(&ns()).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = reporter(files, blobs)
            .compute_usage_with_cancel(&ns(), &cancel)
            .await;

        assert_eq!(report.summary().item_count, 0);
        assert_eq!(report.failures().len(), 2);
        assert!(report
            .failures()
            .iter()
            .all(|f| f.kind == FailureKind::Cancelled));
    }

    #[tokio::test]
    async fn test_timeout_keeps_counted_pages() {
        let files = MemoryFileShare::new(1).with_page_delay(Duration::from_millis(40));
        files
            .add_entries(
                &ns(),
                "audio",
                (0..50).map(|i| StorageEntry::file(i.to_string(), 10)),
            )
            .await;
        let settings = ReporterSettings {
            traversal_timeout: Some(Duration::from_millis(100)),
            ..ReporterSettings::default()
        };
        let reporter = StorageUsageReporter::new(
            Arc::new(files),
            Arc::new(MemoryBlobContainer::new(10)),
            settings,
        );

        let report = reporter.compute_usage(&ns()).await;
        let failure = &report.failures()[0];
        assert_eq!(failure.kind, FailureKind::TimedOut);
        assert_eq!(report.summary().item_count, failure.pages_read);
        assert!(report.summary().item_count < 50);
    }
}
