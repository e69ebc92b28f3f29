//! Walks the paged content listing of a space until the server reports an empty batch.

use tracing::{debug, info, warn};

use crate::contract::ContentSource;
use crate::model::PageRecord;

/// Every page gathered for a space, plus what went wrong on the way.
#[derive(Debug, Clone, Default)]
pub struct SpaceListing {
    /// Pages in fetch order.
    pub pages: Vec<PageRecord>,
    /// Number of batch fetches that failed. Pagination stops at the first one.
    pub fetch_failures: usize,
    /// Offset of the failed fetch, when the listing is incomplete.
    pub truncated_at: Option<usize>,
}

impl SpaceListing {
    pub fn is_complete(&self) -> bool {
        self.fetch_failures == 0
    }
}

/// Fetch every page of `space_key`, `limit` pages per request.
///
/// Best effort: a failed request stops pagination and the pages fetched so far are
/// returned, with the failure recorded in [`SpaceListing::fetch_failures`].
/// `max_pages` optionally caps the total.
pub async fn fetch_all_pages<S>(
    source: &S,
    space_key: &str,
    limit: usize,
    max_pages: Option<usize>,
) -> SpaceListing
where
    S: ContentSource + ?Sized,
{
    let mut listing = SpaceListing::default();
    let mut start = 0;

    'fetch_pages: loop {
        let batch = match source.fetch_batch(space_key, start, limit).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!(error = %e, url = e.target(), start, "Failed to fetch Confluence pages, keeping what was fetched so far");
                listing.fetch_failures += 1;
                listing.truncated_at = Some(start);
                break 'fetch_pages;
            }
        };

        if batch.is_empty() {
            debug!(start, "Empty batch, pagination complete");
            break 'fetch_pages;
        }

        let size = batch.len();
        debug!(start, size, "Fetched batch");
        listing.pages.extend(batch.results);
        start += size;

        if let Some(cap) = max_pages {
            if listing.pages.len() >= cap {
                listing.pages.truncate(cap);
                info!(max_pages = cap, "Reached page cap, stopping pagination");
                break 'fetch_pages;
            }
        }
    }

    info!(
        space_key,
        pages = listing.pages.len(),
        fetch_failures = listing.fetch_failures,
        "Finished listing space"
    );
    listing
}
