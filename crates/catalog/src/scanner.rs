//! Bounded, restartable paging over a record collection.
//!
//! A [`PageCursor`] carries the caller's position and validated page size;
//! [`BatchScanner::scan`] fetches one window at that position. The scanner
//! asks the store for one row more than the window so `done` is exact even
//! when the collection size is a multiple of the page size.

use std::sync::Arc;

use wfcat_db::{Filter, Query, Record, RecordStore, StoreError};

use crate::error::BuildError;

/// Hard upper bound on a single page request.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Number of consumed items between two progress signals.
pub const PROGRESS_INTERVAL: u64 = 10;

// ---------------------------------------------------------------------------
// PageCursor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    start: u64,
    page_size: u64,
    done: bool,
}

impl PageCursor {
    /// Cursor at `start`. A zero page size is rejected; sizes above
    /// [`MAX_PAGE_SIZE`] are clamped.
    pub fn new(start: u64, page_size: u64) -> Result<Self, BuildError> {
        if page_size == 0 {
            return Err(BuildError::InvalidPageSize(page_size));
        }
        Ok(Self {
            start,
            page_size: page_size.min(MAX_PAGE_SIZE),
            done: false,
        })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Move past a fetched page.
    pub fn advance(&mut self, page: &Page) {
        self.start = page.next_start;
        self.done = page.done;
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    /// Offset the page was read from.
    pub start: u64,
    /// Offset to resume from.
    pub next_start: u64,
    /// No rows exist beyond this page.
    pub done: bool,
}

// ---------------------------------------------------------------------------
// BatchScanner
// ---------------------------------------------------------------------------

pub struct BatchScanner {
    store: Arc<dyn RecordStore>,
}

impl BatchScanner {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch the window at `cursor`.
    ///
    /// `query` supplies filters and ordering; its limit and offset are
    /// replaced by the cursor's window.
    pub async fn scan(
        &self,
        collection: &str,
        query: &Query,
        cursor: &PageCursor,
    ) -> Result<Page, StoreError> {
        let window = query
            .clone()
            .offset(cursor.start)
            .limit(cursor.page_size + 1);
        let mut items = self.store.query(collection, &window).await?;

        let done = items.len() as u64 <= cursor.page_size;
        items.truncate(cursor.page_size as usize);
        let next_start = cursor.start + items.len() as u64;

        tracing::debug!(
            collection,
            start = cursor.start,
            items = items.len(),
            done,
            "Scanned page",
        );

        Ok(Page {
            items,
            start: cursor.start,
            next_start,
            done,
        })
    }

    /// Number of rows matching `filters`, using the store's count path.
    pub async fn get_total_count(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> Result<u64, StoreError> {
        self.store.count(collection, filters).await
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Counts consumed items and reports every [`PROGRESS_INTERVAL`]-th one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressTracker {
    processed: u64,
    total: u64,
}

impl ProgressTracker {
    /// `processed` is the number of items consumed before this run, so a
    /// resumed scan keeps reporting absolute positions.
    pub fn new(processed: u64, total: u64) -> Self {
        Self { processed, total }
    }

    /// Consume one item. Returns `(processed, total)` when a progress
    /// signal is due.
    pub fn advance(&mut self) -> Option<(u64, u64)> {
        self.processed += 1;
        (self.processed % PROGRESS_INTERVAL == 0).then_some((self.processed, self.total))
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wfcat_db::memory::CallKind;
    use wfcat_db::MemoryRecordStore;

    fn store(n: usize) -> Arc<MemoryRecordStore> {
        Arc::new(MemoryRecordStore::new().with_records(
            "wf_workflow_version",
            (0..n).map(|i| json!({"sys_id": format!("wf{i}"), "published": true})),
        ))
    }

    async fn scan_all(store: Arc<MemoryRecordStore>, page_size: u64) -> Vec<Page> {
        let scanner = BatchScanner::new(store);
        let mut cursor = PageCursor::new(0, page_size).unwrap();
        let mut pages = Vec::new();
        while !cursor.is_done() {
            let page = scanner
                .scan("wf_workflow_version", &Query::new(), &cursor)
                .await
                .unwrap();
            cursor.advance(&page);
            pages.push(page);
        }
        pages
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_matches!(PageCursor::new(0, 0), Err(BuildError::InvalidPageSize(0)));
    }

    #[test]
    fn oversized_page_is_clamped() {
        let cursor = PageCursor::new(0, 5000).unwrap();
        assert_eq!(cursor.page_size(), MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn exact_fit_page_is_done() {
        let pages = scan_all(store(4), 4).await;
        assert_eq!(pages.len(), 1);
        assert!(pages[0].done);
        assert_eq!(pages[0].next_start, 4);
    }

    #[tokio::test]
    async fn pages_partition_the_collection() {
        let pages = scan_all(store(5), 2).await;
        let sizes: Vec<_> = pages.iter().map(|p| p.items.len()).collect();
        assert_eq!(sizes, [2, 2, 1]);
        assert_eq!(
            pages.iter().map(|p| p.start).collect::<Vec<_>>(),
            [0, 2, 4]
        );
    }

    #[tokio::test]
    async fn empty_collection_yields_one_empty_page() {
        let pages = scan_all(store(0), 3).await;
        assert_eq!(pages.len(), 1);
        assert!(pages[0].items.is_empty());
        assert!(pages[0].done);
    }

    #[tokio::test]
    async fn total_count_never_fetches_rows() {
        let store = store(7);
        let scanner = BatchScanner::new(store.clone());
        let total = scanner
            .get_total_count("wf_workflow_version", &[Filter::eq("published", true)])
            .await
            .unwrap();
        assert_eq!(total, 7);
        assert_eq!(store.calls("wf_workflow_version", CallKind::Query), 0);
    }

    #[test]
    fn progress_fires_every_tenth_item() {
        let mut tracker = ProgressTracker::new(0, 25);
        let signals: Vec<_> = (0..25).filter_map(|_| tracker.advance()).collect();
        assert_eq!(signals, [(10, 25), (20, 25)]);
    }

    #[test]
    fn resumed_progress_keeps_absolute_positions() {
        let mut tracker = ProgressTracker::new(18, 30);
        let signals: Vec<_> = (0..5).filter_map(|_| tracker.advance()).collect();
        assert_eq!(signals, [(20, 30)]);
        assert_eq!(tracker.processed(), 23);
    }
}
