//! Cursor-driven listing exposed as a lazy stream of pages
//!
//! Each stream item is one page of entries. The next page is only requested
//! when the consumer polls for it, so at most one page is held in memory.
//! The stream ends after the first page without a continuation cursor, or
//! right after yielding a fetch error.

use crate::error::{PlaylistError, Result};
use crate::storage::types::{Page, StorageEntry, StorageNamespace};
use crate::storage::{BlobContainerStore, FileShareStore};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};

/// Lazy sequence of listing pages
pub type PageStream<'a> = BoxStream<'a, Result<Vec<StorageEntry>>>;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Build a page stream from a single-page fetch function
pub fn page_stream<'a, F>(mut fetch: F) -> PageStream<'a>
where
    F: FnMut(Option<String>) -> BoxFuture<'a, Result<Page>> + Send + 'a,
{
    stream::try_unfold(Cursor::Start, move |state| {
        let (previous, request) = match state {
            Cursor::Done => (None, None),
            Cursor::Start => (None, Some(fetch(None))),
            Cursor::Next(cursor) => (Some(cursor.clone()), Some(fetch(Some(cursor)))),
        };

        async move {
            let Some(request) = request else {
                return Ok(None);
            };

            let page = request.await?;
            let next = match page.next_cursor.filter(|c| !c.is_empty()) {
                None => Cursor::Done,
                Some(cursor) if previous.as_deref() == Some(cursor.as_str()) => {
                    return Err(PlaylistError::PageFetch(format!(
                        "listing cursor {:?} did not advance",
                        cursor
                    )));
                }
                Some(cursor) => Cursor::Next(cursor),
            };

            Ok(Some((page.entries, next)))
        }
    })
    .boxed()
}

/// Pages of one directory inside a file share
pub fn file_pages<'a>(
    store: &'a dyn FileShareStore,
    namespace: &'a StorageNamespace,
    path: &'a str,
) -> PageStream<'a> {
    page_stream(move |cursor| {
        Box::pin(async move { store.list_page(namespace, path, cursor.as_deref()).await })
    })
}

/// Pages of a blob container
pub fn blob_pages<'a>(
    store: &'a dyn BlobContainerStore,
    namespace: &'a StorageNamespace,
) -> PageStream<'a> {
    page_stream(move |cursor| {
        Box::pin(async move { store.list_page(namespace, cursor.as_deref()).await })
    })
}
