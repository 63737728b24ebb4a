use async_trait::async_trait;
use uuid::Uuid;

use faultline_core::errors::Result;
use faultline_protocol::logs::{ErrorLog, LogQuery, LogStatus};

/// Persistence contract consumed by the query executor and the
/// ingestion path.
///
/// All calls are bounded by the underlying pool's acquire timeout and
/// surface `StoreUnavailable` instead of hanging. `find_page` and
/// `count` must evaluate the same predicate so a page and its metadata
/// describe the same result set.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Persists the batch and returns the stored representations, in
    /// insertion order.
    async fn insert_many(&self, logs: Vec<ErrorLog>) -> Result<Vec<ErrorLog>>;

    /// Updates the status of one record; `None` when the id is unknown.
    async fn update_status_by_id(&self, id: Uuid, status: LogStatus)
        -> Result<Option<ErrorLog>>;

    /// Fetches one sorted window of records matching the query's filters.
    async fn find_page(&self, query: &LogQuery, skip: i64, limit: i64) -> Result<Vec<ErrorLog>>;

    /// Counts records matching the query's filters.
    async fn count(&self, query: &LogQuery) -> Result<i64>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cmp::Ordering;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use uuid::Uuid;

    use faultline_core::errors::{FaultlineError, Result};
    use faultline_protocol::logs::{ErrorLog, LogQuery, LogStatus, SortField, SortOrder};

    use super::LogStore;

    /// In-memory stand-in for the Postgres repository, mirroring its
    /// predicate and ordering semantics.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        logs: Arc<Mutex<Vec<ErrorLog>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every subsequent call fail as if the store were down.
        pub fn set_unavailable(&self, unavailable: bool) {
            *self.fail.lock() = unavailable;
        }

        fn check_available(&self) -> Result<()> {
            if *self.fail.lock() {
                Err(FaultlineError::StoreUnavailable(
                    "memory store marked unavailable".to_string(),
                ))
            } else {
                Ok(())
            }
        }

        fn matches(log: &ErrorLog, query: &LogQuery) -> bool {
            if let Some(level) = query.level {
                if log.level != level {
                    return false;
                }
            }
            if let Some(status) = query.status {
                if log.status != status {
                    return false;
                }
            }
            if let Some(source) = &query.source {
                if log.source.as_deref() != Some(source.as_str()) {
                    return false;
                }
            }
            if let Some(start) = query.start_date {
                if log.server_timestamp < start {
                    return false;
                }
            }
            if let Some(end) = query.end_date {
                if log.server_timestamp > end {
                    return false;
                }
            }
            if let Some(search) = &query.search {
                let needle = search.to_lowercase();
                let in_message = log.message.to_lowercase().contains(&needle);
                let in_stack = log
                    .stack_trace
                    .as_deref()
                    .map(|stack| stack.to_lowercase().contains(&needle))
                    .unwrap_or(false);
                if !in_message && !in_stack {
                    return false;
                }
            }
            true
        }

        fn compare(a: &ErrorLog, b: &ErrorLog, query: &LogQuery) -> Ordering {
            let ordering = match query.sort_by {
                SortField::ServerTimestamp => a.server_timestamp.cmp(&b.server_timestamp),
                SortField::ClientTimestamp => a.client_timestamp.cmp(&b.client_timestamp),
                SortField::Level => a.level.as_str().cmp(b.level.as_str()),
                SortField::Source => a.source.cmp(&b.source),
                SortField::Status => a.status.as_str().cmp(b.status.as_str()),
                SortField::Message => a.message.cmp(&b.message),
            };
            let ordering = match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            // Same tie-break as the repository: pagination stays stable
            // across calls when the sort field has duplicates.
            ordering.then_with(|| a.id.cmp(&b.id))
        }
    }

    #[async_trait]
    impl LogStore for MemoryStore {
        async fn insert_many(&self, logs: Vec<ErrorLog>) -> Result<Vec<ErrorLog>> {
            self.check_available()?;
            let mut stored = self.logs.lock();
            stored.extend(logs.iter().cloned());
            Ok(logs)
        }

        async fn update_status_by_id(
            &self,
            id: Uuid,
            status: LogStatus,
        ) -> Result<Option<ErrorLog>> {
            self.check_available()?;
            let mut stored = self.logs.lock();
            let Some(log) = stored.iter_mut().find(|log| log.id == id) else {
                return Ok(None);
            };
            log.status = status;
            log.updated_at = Utc::now();
            Ok(Some(log.clone()))
        }

        async fn find_page(
            &self,
            query: &LogQuery,
            skip: i64,
            limit: i64,
        ) -> Result<Vec<ErrorLog>> {
            self.check_available()?;
            let stored = self.logs.lock();
            let mut matching: Vec<ErrorLog> = stored
                .iter()
                .filter(|log| Self::matches(log, query))
                .cloned()
                .collect();
            matching.sort_by(|a, b| Self::compare(a, b, query));
            Ok(matching
                .into_iter()
                .skip(skip.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect())
        }

        async fn count(&self, query: &LogQuery) -> Result<i64> {
            self.check_available()?;
            let stored = self.logs.lock();
            Ok(stored.iter().filter(|log| Self::matches(log, query)).count() as i64)
        }
    }
}
