//! # contract: the seam between the export pipeline and the remote wiki
//!
//! The pipeline never talks HTTP directly. Everything it needs from the remote side goes
//! through [`ContentSource`]: listing one batch of pages, and downloading one attachment.
//!
//! ## Implementors
//! - [`crate::client::ConfluenceClient`] is the real implementation (reqwest).
//! - `MockContentSource` is generated by `mockall` for tests, exported when the
//!   `test-export-mocks` feature is enabled (it is by default).
//!
//! ## Error contract
//! Methods return [`FetchError`] for a single failed call. Implementors must not retry;
//! callers decide whether a failure truncates, skips or aborts.

use async_trait::async_trait;
use std::path::Path;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::FetchError;
use crate::model::ContentBatch;

/// `expand` parameter sent with every content listing.
pub const CONTENT_EXPAND: &str = "body.storage,version,children.attachment";

/// Read access to a wiki space.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the batch of pages of `space_key` starting at offset `start`.
    async fn fetch_batch(
        &self,
        space_key: &str,
        start: usize,
        limit: usize,
    ) -> Result<ContentBatch, FetchError>;

    /// Download the attachment behind `link` into `dest`, streaming the body.
    ///
    /// Returns the absolute URL that was downloaded.
    async fn download_attachment(&self, link: &str, dest: &Path) -> Result<String, FetchError>;
}
