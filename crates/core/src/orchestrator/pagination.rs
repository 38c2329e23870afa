//! Cursor-driven collection of paginated results.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::throttle::Throttle;
use crate::catalog::TracksPage;
use crate::matching::CatalogTrack;
use crate::metrics;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when more data is available.
    pub next_cursor: Option<String>,
}

impl From<TracksPage> for Page<CatalogTrack> {
    fn from(page: TracksPage) -> Self {
        Page {
            items: page.tracks,
            next_cursor: page.next_cursor,
        }
    }
}

/// Everything collected by [`fetch_all_pages`].
#[derive(Debug, Clone, PartialEq)]
pub struct PagedFetch<T> {
    pub items: Vec<T>,
    pub pages: usize,
    /// Error that stopped paging early, if any.
    pub interrupted: Option<String>,
}

impl<T> PagedFetch<T> {
    /// Whether the last page was reached.
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

/// Fetch pages until one has no next cursor.
///
/// `page_delay` is paused only before fetching a next page. A failing
/// fetch stops paging; what was accumulated so far is returned with the
/// error recorded in [`PagedFetch::interrupted`]. A page that hands back
/// the cursor it was fetched with also ends paging.
pub async fn fetch_all_pages<T, E, F, Fut>(
    initial_cursor: Option<String>,
    throttle: &dyn Throttle,
    page_delay: Duration,
    mut fetch_page: F,
) -> PagedFetch<T>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: Display,
{
    let mut items = Vec::new();
    let mut pages = 0;
    let mut cursor = initial_cursor;

    loop {
        let page = match fetch_page(cursor.clone()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(page = pages, error = %e, "Page fetch failed, returning partial result");
                return PagedFetch {
                    items,
                    pages,
                    interrupted: Some(e.to_string()),
                };
            }
        };

        pages += 1;
        metrics::PAGES_FETCHED.inc();
        items.extend(page.items);

        match page.next_cursor {
            Some(next) if cursor.as_deref() == Some(next.as_str()) => {
                warn!(cursor = %next, "Page returned its own cursor, stopping");
                break;
            }
            Some(next) => {
                debug!(page = pages, accumulated = items.len(), "Fetching next page");
                throttle.pause(page_delay).await;
                cursor = Some(next);
            }
            None => break,
        }
    }

    PagedFetch {
        items,
        pages,
        interrupted: None,
    }
}
