use std::sync::Arc;
use std::time::Duration;

use crate::errors::{Result, StorageError};
use crate::models::{PageSpec, ProductRecord};
use crate::pager::select_range;
use crate::store::ProductStore;

/// Serves one page of the sorted catalog per call.
pub struct CatalogQuery {
    store: Arc<dyn ProductStore>,
    timeout: Duration,
}

impl CatalogQuery {
    pub fn new(store: Arc<dyn ProductStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Sorts the whole catalog in the store, then slices out the requested
    /// page. No partial result is returned on failure.
    pub async fn list(&self, spec: &PageSpec) -> Result<Vec<ProductRecord>> {
        let mut records = tokio::time::timeout(self.timeout, self.store.find_sorted(spec.sort))
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))??;

        let total_len = i64::try_from(records.len())
            .map_err(|_| StorageError::InvalidArg("result set too large".to_string()))?;
        let (start, end) = select_range(spec.page_number, spec.page_size, total_len);
        log::debug!(
            "Listing {} {} page {} (size {}): rows {}..{} of {}",
            spec.sort.column,
            spec.sort.direction,
            spec.page_number,
            spec.page_size,
            start,
            end,
            total_len
        );

        // select_range keeps both bounds inside 0..=total_len.
        records.truncate(end as usize);
        Ok(records.split_off(start as usize))
    }
}
