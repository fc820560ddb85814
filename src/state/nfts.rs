//! "Load more" pager over a user's NFT listing.

use crate::net::api;
use crate::net::client::AuthHttpClient;
use crate::net::error::ApiError;
use crate::net::types::{Nft, NftListKind, Page};

/// Accumulated listing for one `(username, kind)` pair.
///
/// Page 1 replaces whatever was loaded; later pages append. `has_next`
/// mirrors the backend's `next` link from the last page loaded.
#[derive(Clone, Debug)]
pub struct NftFeed {
    username: String,
    kind: NftListKind,
    page_size: u32,
    items: Vec<Nft>,
    /// Last page loaded; 0 before the first fetch.
    page: u32,
    has_next: bool,
    total: u64,
}

impl NftFeed {
    #[must_use]
    pub fn new(username: impl Into<String>, kind: NftListKind, page_size: u32) -> Self {
        Self {
            username: username.into(),
            kind,
            page_size: page_size.max(1),
            items: Vec::new(),
            page: 0,
            has_next: false,
            total: 0,
        }
    }

    /// Switch to another listing and drop everything loaded so far.
    pub fn reset(&mut self, username: impl Into<String>, kind: NftListKind) {
        *self = Self::new(username, kind, self.page_size);
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn kind(&self) -> NftListKind {
        self.kind
    }

    #[must_use]
    pub fn items(&self) -> &[Nft] {
        &self.items
    }

    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Total count reported by the backend for this listing.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether `load_next` would issue a request. A feed without a username
    /// never fetches.
    #[must_use]
    pub fn can_load_more(&self) -> bool {
        !self.username.is_empty() && (self.page == 0 || self.has_next)
    }

    /// Fetch the next page and fold it in. Returns how many items arrived;
    /// `Ok(0)` without a request when there is nothing more to load.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error; the feed is left unchanged.
    pub async fn load_next(&mut self, client: &AuthHttpClient) -> Result<usize, ApiError> {
        if !self.can_load_more() {
            return Ok(0);
        }
        let next_page = self.page + 1;
        let page = api::fetch_user_nfts(client, &self.username, self.kind, next_page, self.page_size).await?;
        tracing::debug!(username = %self.username, page = next_page, count = page.results.len(), "nft page loaded");
        Ok(self.apply_page(next_page, page))
    }

    /// Fold a fetched page into the feed; returns the number of new items.
    pub fn apply_page(&mut self, page_no: u32, page: Page<Nft>) -> usize {
        let added = page.results.len();
        if page_no <= 1 {
            self.items = page.results;
        } else {
            self.items.extend(page.results);
        }
        self.page = page_no;
        self.has_next = page.next.is_some();
        self.total = page.count;
        added
    }
}

#[cfg(test)]
#[path = "nfts_test.rs"]
mod tests;
