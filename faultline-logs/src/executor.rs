use std::sync::Arc;

use tracing::debug;

use faultline_core::errors::Result;
use faultline_protocol::logs::{LogPage, LogQuery, Pagination};

use crate::cache::ResponseCache;
use crate::store::LogStore;

/// Answers normalized listing queries, memoizing results in the
/// response cache.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn LogStore>,
    cache: ResponseCache,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn LogStore>, cache: ResponseCache) -> Self {
        Self { store, cache }
    }

    /// Returns the page for `query`, from cache when a fresh entry
    /// exists; cache hits come back with `cached: true`.
    ///
    /// The count and the window are fetched together so the metadata
    /// and the records describe the same predicate; a page past the end
    /// of the result set yields an empty list with accurate totals.
    pub async fn execute(&self, query: &LogQuery) -> Result<LogPage> {
        let key = query.cache_key();

        if let Some(mut page) = self.cache.get(&key) {
            debug!(%key, "serving listing from cache");
            page.cached = true;
            return Ok(page);
        }

        let skip = i64::from(query.page.saturating_sub(1)) * i64::from(query.limit);
        let (data, total) = tokio::try_join!(
            self.store.find_page(query, skip, i64::from(query.limit)),
            self.store.count(query),
        )?;

        let page = LogPage {
            data,
            pagination: Pagination::compute(query.page, query.limit, total.max(0) as u64),
            cached: false,
        };

        // Failed lookups never reach this point, so only complete
        // pages are memoized.
        self.cache.set(&key, page.clone());
        Ok(page)
    }
}
