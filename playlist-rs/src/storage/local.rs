//! Filesystem-backed file share and blob container
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/shares/<namespace>/<audio>/...   file share
//! <root>/containers/<namespace>/...       blob container (listed flat)
//! <root>/tmp/                             staging for atomic writes
//! ```

use crate::error::{PlaylistError, Result};
use crate::storage::types::{Page, StorageEntry, StorageNamespace};
use crate::storage::{BlobContainerStore, FileShareStore};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

pub struct LocalStorage {
    root: PathBuf,
    page_size: usize,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            root: root.into(),
            page_size: page_size.max(1),
        }
    }

    fn share_path(&self, namespace: &StorageNamespace) -> PathBuf {
        self.root.join("shares").join(namespace.as_str())
    }

    fn container_path(&self, namespace: &StorageNamespace) -> PathBuf {
        self.root.join("containers").join(namespace.as_str())
    }

    /// Create the share, its audio directory and the container
    pub async fn provision(&self, namespace: &StorageNamespace, audio_directory: &str) -> Result<()> {
        validate_segment(audio_directory)?;

        for dir in [
            self.share_path(namespace).join(audio_directory),
            self.container_path(namespace),
        ] {
            fs::create_dir_all(&dir).await.map_err(|e| {
                PlaylistError::Storage(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        info!("Provisioned storage namespace {}", namespace);
        Ok(())
    }

    /// Write a file into a share directory, replacing any previous version
    pub async fn store_file(
        &self,
        namespace: &StorageNamespace,
        directory: &str,
        name: &str,
        data: &[u8],
    ) -> Result<u64> {
        validate_segment(directory)?;
        validate_segment(name)?;

        let dir = self.share_path(namespace).join(directory);
        if !is_dir(&dir).await? {
            return Err(PlaylistError::StoreUnavailable(format!(
                "{}/{}",
                namespace, directory
            )));
        }

        self.write_atomic(&dir.join(name), data).await?;
        debug!("Stored {} bytes as {}/{}/{}", data.len(), namespace, directory, name);
        Ok(data.len() as u64)
    }

    /// Remove a file from a share directory.
    ///
    /// Returns `false` when the share or the directory does not exist.
    pub async fn remove_file(
        &self,
        namespace: &StorageNamespace,
        directory: &str,
        name: &str,
    ) -> Result<bool> {
        validate_segment(directory)?;
        validate_segment(name)?;

        let share = self.share_path(namespace);
        if !is_dir(&share).await? {
            return Ok(false);
        }
        let dir = share.join(directory);
        if !is_dir(&dir).await? {
            return Ok(false);
        }

        match fs::remove_file(dir.join(name)).await {
            Ok(()) => {
                info!("Removed {}/{}/{}", namespace, directory, name);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }

    /// Write a blob; `name` may contain `/`-separated segments
    pub async fn put_blob(&self, namespace: &StorageNamespace, name: &str, data: &[u8]) -> Result<()> {
        let container = self.container_path(namespace);
        if !is_dir(&container).await? {
            return Err(PlaylistError::StoreUnavailable(namespace.to_string()));
        }

        let target = container.join(blob_relative_path(name)?);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        self.write_atomic(&target, data).await
    }

    pub async fn read_blob(&self, namespace: &StorageNamespace, name: &str) -> Result<Vec<u8>> {
        let path = self.container_path(namespace).join(blob_relative_path(name)?);

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PlaylistError::NotFound(
                format!("blob {} in {}", name, namespace),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<()> {
        let staging = self.root.join("tmp");
        fs::create_dir_all(&staging).await?;

        let tmp_path = staging.join(Uuid::new_v4().to_string());
        fs::write(&tmp_path, data).await?;
        fs::rename(&tmp_path, target).await?;
        Ok(())
    }

    fn paginate(&self, mut entries: Vec<StorageEntry>, cursor: Option<&str>) -> Page {
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut remaining = entries
            .into_iter()
            .filter(|entry| cursor.map_or(true, |c| entry.name.as_str() > c))
            .peekable();

        let page: Vec<StorageEntry> = remaining.by_ref().take(self.page_size).collect();
        if remaining.peek().is_some() {
            let cursor = page.last().map(|e| e.name.clone()).unwrap_or_default();
            Page::with_cursor(page, cursor)
        } else {
            Page::last(page)
        }
    }
}

#[async_trait::async_trait]
impl FileShareStore for LocalStorage {
    async fn share_exists(&self, namespace: &StorageNamespace) -> Result<bool> {
        is_dir(&self.share_path(namespace)).await
    }

    async fn directory_exists(&self, namespace: &StorageNamespace, path: &str) -> Result<bool> {
        validate_segment(path)?;
        is_dir(&self.share_path(namespace).join(path)).await
    }

    async fn list_page(
        &self,
        namespace: &StorageNamespace,
        path: &str,
        cursor: Option<&str>,
    ) -> Result<Page> {
        validate_segment(path)?;
        let dir = self.share_path(namespace).join(path);

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&dir).await.map_err(|e| {
            PlaylistError::PageFetch(format!("Failed to list {:?}: {}", dir, e))
        })?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = entry.metadata().await?;
            if metadata.is_dir() {
                entries.push(StorageEntry::directory(name));
            } else {
                entries.push(StorageEntry::file(name, metadata.len()));
            }
        }

        Ok(self.paginate(entries, cursor))
    }
}

#[async_trait::async_trait]
impl BlobContainerStore for LocalStorage {
    async fn container_exists(&self, namespace: &StorageNamespace) -> Result<bool> {
        is_dir(&self.container_path(namespace)).await
    }

    async fn list_page(&self, namespace: &StorageNamespace, cursor: Option<&str>) -> Result<Page> {
        let container = self.container_path(namespace);

        let mut blobs = Vec::new();
        let mut pending = vec![container.clone()];
        while let Some(dir) = pending.pop() {
            let mut read_dir = fs::read_dir(&dir).await.map_err(|e| {
                PlaylistError::PageFetch(format!("Failed to list {:?}: {}", dir, e))
            })?;
            while let Some(entry) = read_dir.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                let name = blob_name(&container, &entry.path())?;
                blobs.push(StorageEntry::blob(name, metadata.len()));
            }
        }

        Ok(self.paginate(blobs, cursor))
    }
}

async fn is_dir(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        return Err(PlaylistError::Parse(format!("invalid path segment {:?}", segment)));
    }
    Ok(())
}

fn blob_relative_path(name: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for segment in name.split('/') {
        validate_segment(segment)?;
        path.push(segment);
    }
    Ok(path)
}

fn blob_name(container: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(container)
        .map_err(|e| PlaylistError::Storage(e.to_string()))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/"))
}
