//! Incremental fetch of the base catalog listing.

use std::sync::Arc;

use bestiary_catalog::{CatalogClientError, PageCursor, SummaryRef};
use thiserror::Error;
use tracing::debug;

use crate::cache::CatalogStore;
use crate::providers::catalog::Client;

/// Fixed page size of the base listing.
pub const PAGE_SIZE: u32 = 20;

/// Failing to load more is a meaningful, user-actionable event, so this is
/// the one surface where a fetch failure reaches the caller as an error.
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("failed to fetch the next catalog page: {0}")]
    Fetch(Arc<CatalogClientError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Idle { has_more: bool },
    Fetching,
    Error,
}

/// Drives the listing page by page, accumulating summaries in arrival order
/// (which is ascending ID).
#[derive(Debug)]
pub struct PaginationController {
    summaries: Vec<SummaryRef>,
    /// Cursor for the next page; `None` once the source reports exhaustion.
    /// Always comes from the previous page's response, never from arithmetic
    /// here.
    next: Option<PageCursor>,
    state: PageState,
    total: Option<u64>,
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationController {
    pub fn new() -> Self {
        Self {
            summaries: Vec::new(),
            next: Some(PageCursor::start(PAGE_SIZE)),
            state: PageState::Idle { has_more: true },
            total: None,
        }
    }

    /// The flattened accumulated sequence.
    pub fn accumulated(&self) -> &[SummaryRef] {
        &self.summaries
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Total the source reports for the listing, once a page has arrived.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Fetch and append the next page.
    ///
    /// No-op (returns `Ok(false)`) while a fetch is in flight or the listing
    /// is exhausted. On failure the accumulated data stays intact, the
    /// controller enters the error state, and the next call retries.
    pub async fn fetch_next(
        &mut self,
        store: &CatalogStore,
        client: &Client,
    ) -> Result<bool, PaginationError> {
        let cursor = match (self.state, self.next) {
            (PageState::Fetching, _) => return Ok(false),
            (_, None) => return Ok(false),
            (_, Some(cursor)) => cursor,
        };
        self.state = PageState::Fetching;
        match store.page(client, cursor).await {
            Ok(page) => {
                self.summaries.extend(page.summaries.iter().cloned());
                self.next = page.next;
                self.total = Some(page.total);
                self.state = PageState::Idle {
                    has_more: self.next.is_some(),
                };
                debug!(
                    appended = page.summaries.len(),
                    accumulated = self.summaries.len(),
                    has_more = self.next.is_some(),
                    "appended listing page"
                );
                Ok(true)
            },
            Err(err) => {
                self.state = PageState::Error;
                Err(PaginationError::Fetch(err))
            },
        }
    }
}
