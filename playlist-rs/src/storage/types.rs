//! Storage types shared by the store backends and the usage reporter

use crate::error::{PlaylistError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a user's isolated storage area.
///
/// The same value names the user's file share and blob container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageNamespace(String);

impl StorageNamespace {
    /// Wrap an existing identifier
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();

        if value.is_empty() {
            return Err(PlaylistError::InvalidNamespace(
                "namespace must not be empty".to_string(),
            ));
        }
        if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
            return Err(PlaylistError::InvalidNamespace(value));
        }

        Ok(Self(value))
    }

    /// Allocate a fresh namespace for a new account
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageNamespace {
    type Error = PlaylistError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<StorageNamespace> for String {
    fn from(namespace: StorageNamespace) -> Self {
        namespace.0
    }
}

/// Kind of a listed storage item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
    Blob,
}

/// One item returned by a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Absent for directories
    pub size_in_bytes: Option<u64>,
}

impl StorageEntry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size_in_bytes: None,
        }
    }

    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size_in_bytes: Some(size),
        }
    }

    pub fn blob(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Blob,
            size_in_bytes: Some(size),
        }
    }

    /// Bytes this entry contributes to a usage total
    pub fn counted_bytes(&self) -> u64 {
        match self.kind {
            EntryKind::Directory => 0,
            EntryKind::File | EntryKind::Blob => self.size_in_bytes.unwrap_or(0),
        }
    }
}

/// A single listing page and the cursor for the next one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub entries: Vec<StorageEntry>,
    /// `None` when the listing is exhausted
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn last(entries: Vec<StorageEntry>) -> Self {
        Self {
            entries,
            next_cursor: None,
        }
    }

    pub fn with_cursor(entries: Vec<StorageEntry>, cursor: impl Into<String>) -> Self {
        Self {
            entries,
            next_cursor: Some(cursor.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_rejects_empty() {
        assert!(StorageNamespace::new("").is_err());
    }

    #[test]
    fn test_namespace_rejects_path_traversal() {
        assert!(StorageNamespace::new("..").is_err());
        assert!(StorageNamespace::new("a/b").is_err());
        assert!(StorageNamespace::new("a\\b").is_err());
    }

    #[test]
    fn test_generated_namespaces_differ() {
        let a = StorageNamespace::generate();
        let b = StorageNamespace::generate();
        assert_ne!(a, b);
        assert!(StorageNamespace::new(a.as_str()).is_ok());
    }

    #[test]
    fn test_namespace_deserialize_validates() {
        let ok: StorageNamespace = serde_json::from_str("\"user-folder\"").unwrap();
        assert_eq!(ok.as_str(), "user-folder");

        let bad = serde_json::from_str::<StorageNamespace>("\"../etc\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_directory_counts_no_bytes() {
        let dir = StorageEntry::directory("live");
        assert_eq!(dir.counted_bytes(), 0);
        assert_eq!(StorageEntry::file("a.mp3", 150).counted_bytes(), 150);
        assert_eq!(StorageEntry::blob("b.mp3", 75).counted_bytes(), 75);
    }
}
