//! In-memory stores
//!
//! Entries are served in insertion order with numeric offset cursors.
//! Failures and latency can be injected to exercise degraded traversals.

use crate::error::{PlaylistError, Result};
use crate::storage::types::{Page, StorageEntry, StorageNamespace};
use crate::storage::{BlobContainerStore, FileShareStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Injected behaviour shared by both in-memory stores
#[derive(Debug, Clone, Default)]
struct Faults {
    /// 1-based page number whose request fails
    fail_on_page: Option<usize>,
    fail_existence_checks: bool,
    page_delay: Option<Duration>,
}

struct Pager {
    page_size: usize,
    faults: Faults,
    page_requests: AtomicUsize,
}

impl Pager {
    fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            faults: Faults::default(),
            page_requests: AtomicUsize::new(0),
        }
    }

    fn check_existence(&self) -> Result<()> {
        if self.faults.fail_existence_checks {
            return Err(PlaylistError::StoreUnavailable(
                "injected existence check failure".to_string(),
            ));
        }
        Ok(())
    }

    async fn page(&self, entries: &[StorageEntry], cursor: Option<&str>) -> Result<Page> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.faults.page_delay {
            tokio::time::sleep(delay).await;
        }

        let offset = match cursor {
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| PlaylistError::PageFetch(format!("malformed cursor {:?}", c)))?,
            None => 0,
        };

        let page_number = offset / self.page_size + 1;
        if self.faults.fail_on_page == Some(page_number) {
            return Err(PlaylistError::PageFetch(format!(
                "injected failure on page {}",
                page_number
            )));
        }

        let end = (offset + self.page_size).min(entries.len());
        let slice = entries.get(offset..end).unwrap_or_default().to_vec();

        if end < entries.len() {
            Ok(Page::with_cursor(slice, end.to_string()))
        } else {
            Ok(Page::last(slice))
        }
    }
}

/// Hierarchical store kept in memory
pub struct MemoryFileShare {
    /// namespace -> directory path -> entries
    shares: RwLock<HashMap<String, HashMap<String, Vec<StorageEntry>>>>,
    pager: Pager,
}

impl MemoryFileShare {
    pub fn new(page_size: usize) -> Self {
        Self {
            shares: RwLock::new(HashMap::new()),
            pager: Pager::new(page_size),
        }
    }

    /// Fail the request for the given 1-based page number
    pub fn fail_on_page(mut self, page_number: usize) -> Self {
        self.pager.faults.fail_on_page = Some(page_number);
        self
    }

    pub fn fail_existence_checks(mut self) -> Self {
        self.pager.faults.fail_existence_checks = true;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.pager.faults.page_delay = Some(delay);
        self
    }

    /// Create an empty share
    pub async fn create_share(&self, namespace: &StorageNamespace) {
        self.shares
            .write()
            .await
            .entry(namespace.as_str().to_string())
            .or_default();
    }

    /// Create the share if needed and append entries to one of its directories
    pub async fn add_entries(
        &self,
        namespace: &StorageNamespace,
        path: &str,
        entries: impl IntoIterator<Item = StorageEntry>,
    ) {
        let mut shares = self.shares.write().await;
        shares
            .entry(namespace.as_str().to_string())
            .or_default()
            .entry(path.to_string())
            .or_default()
            .extend(entries);
    }

    /// Number of page requests served so far
    pub fn page_requests(&self) -> usize {
        self.pager.page_requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl FileShareStore for MemoryFileShare {
    async fn share_exists(&self, namespace: &StorageNamespace) -> Result<bool> {
        self.pager.check_existence()?;
        Ok(self.shares.read().await.contains_key(namespace.as_str()))
    }

    async fn directory_exists(&self, namespace: &StorageNamespace, path: &str) -> Result<bool> {
        self.pager.check_existence()?;
        Ok(self
            .shares
            .read()
            .await
            .get(namespace.as_str())
            .map_or(false, |dirs| dirs.contains_key(path)))
    }

    async fn list_page(
        &self,
        namespace: &StorageNamespace,
        path: &str,
        cursor: Option<&str>,
    ) -> Result<Page> {
        let shares = self.shares.read().await;
        let entries = shares
            .get(namespace.as_str())
            .and_then(|dirs| dirs.get(path))
            .ok_or_else(|| PlaylistError::StoreUnavailable(format!("{}/{}", namespace, path)))?;

        self.pager.page(entries, cursor).await
    }
}

/// Flat store kept in memory
pub struct MemoryBlobContainer {
    containers: RwLock<HashMap<String, Vec<StorageEntry>>>,
    pager: Pager,
}

impl MemoryBlobContainer {
    pub fn new(page_size: usize) -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
            pager: Pager::new(page_size),
        }
    }

    /// Fail the request for the given 1-based page number
    pub fn fail_on_page(mut self, page_number: usize) -> Self {
        self.pager.faults.fail_on_page = Some(page_number);
        self
    }

    pub fn fail_existence_checks(mut self) -> Self {
        self.pager.faults.fail_existence_checks = true;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.pager.faults.page_delay = Some(delay);
        self
    }

    pub async fn create_container(&self, namespace: &StorageNamespace) {
        self.containers
            .write()
            .await
            .entry(namespace.as_str().to_string())
            .or_default();
    }

    /// Create the container if needed and append blobs to it
    pub async fn add_blobs(
        &self,
        namespace: &StorageNamespace,
        blobs: impl IntoIterator<Item = StorageEntry>,
    ) {
        self.containers
            .write()
            .await
            .entry(namespace.as_str().to_string())
            .or_default()
            .extend(blobs);
    }

    pub fn page_requests(&self) -> usize {
        self.pager.page_requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BlobContainerStore for MemoryBlobContainer {
    async fn container_exists(&self, namespace: &StorageNamespace) -> Result<bool> {
        self.pager.check_existence()?;
        Ok(self.containers.read().await.contains_key(namespace.as_str()))
    }

    async fn list_page(&self, namespace: &StorageNamespace, cursor: Option<&str>) -> Result<Page> {
        let containers = self.containers.read().await;
        let blobs = containers
            .get(namespace.as_str())
            .ok_or_else(|| PlaylistError::StoreUnavailable(namespace.to_string()))?;

        self.pager.page(blobs, cursor).await
    }
}
