//! Per-user storage backends
//!
//! Two stores hold a user's files, both addressed by the same
//! [`StorageNamespace`]:
//! - a hierarchical file share, where uploaded audio lives in one directory
//! - a flat blob container
//!
//! Backends:
//! - [`local`]: directories on the local filesystem
//! - [`memory`]: in-process maps, used by tests and development

pub mod local;
pub mod memory;
pub mod paging;
pub mod types;

pub use local::LocalStorage;
pub use memory::{MemoryBlobContainer, MemoryFileShare};
pub use paging::{blob_pages, file_pages, PageStream};
pub use types::{EntryKind, Page, StorageEntry, StorageNamespace};

use crate::error::Result;

/// Hierarchical file store
#[async_trait::async_trait]
pub trait FileShareStore: Send + Sync {
    /// Whether the namespace's share has been provisioned
    async fn share_exists(&self, namespace: &StorageNamespace) -> Result<bool>;

    /// Whether `path` exists as a directory inside the share
    async fn directory_exists(&self, namespace: &StorageNamespace, path: &str) -> Result<bool>;

    /// List one page of the directory's direct children
    async fn list_page(
        &self,
        namespace: &StorageNamespace,
        path: &str,
        cursor: Option<&str>,
    ) -> Result<Page>;
}

/// Flat object store
#[async_trait::async_trait]
pub trait BlobContainerStore: Send + Sync {
    /// Whether the namespace's container has been provisioned
    async fn container_exists(&self, namespace: &StorageNamespace) -> Result<bool>;

    /// List one page of the container's objects
    async fn list_page(&self, namespace: &StorageNamespace, cursor: Option<&str>)
        -> Result<Page>;
}
