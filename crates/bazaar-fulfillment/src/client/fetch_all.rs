//! Multi-page fetch loop for `FulfillmentClient`.

use std::time::Duration;

use bazaar_core::RemoteCatalogItem;

use crate::error::ApiError;
use crate::filters::CatalogFilters;

use super::FulfillmentClient;
use super::MAX_PAGES;

impl FulfillmentClient {
    /// Walks the listing from `filters.page` (default 1) through the last page
    /// and returns every item collected.
    ///
    /// `inter_request_delay_ms` is slept between page requests, not before the
    /// first one. Cached pages still observe the delay.
    ///
    /// Any page failure discards what was collected so far.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`Self::fetch_page`]. Returns
    /// [`ApiError::PaginationLimit`] if more than [`MAX_PAGES`] pages are walked.
    pub async fn fetch_all(
        &self,
        filters: &CatalogFilters,
        inter_request_delay_ms: u64,
    ) -> Result<Vec<RemoteCatalogItem>, ApiError> {
        let mut all_items: Vec<RemoteCatalogItem> = Vec::new();
        let mut page_number = filters.current_page();
        let mut page_count = 0usize;

        loop {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(ApiError::PaginationLimit {
                    max_pages: MAX_PAGES,
                });
            }

            if page_count > 1 && inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(inter_request_delay_ms)).await;
            }

            let page = self.fetch_page(&filters.with_page(page_number)).await?;
            let has_next = page.has_next_page();
            tracing::debug!(
                page = page.page,
                total_pages = page.total_pages,
                items = page.items.len(),
                "fetched catalog page"
            );
            all_items.extend(page.items);

            if !has_next {
                break;
            }
            page_number = page.page.saturating_add(1);
        }

        Ok(all_items)
    }
}
