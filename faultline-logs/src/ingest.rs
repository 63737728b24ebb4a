use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use faultline_core::errors::{FaultlineError, Result};
use faultline_protocol::logs::{ErrorLog, ErrorLogDraft, LogStatus};

use crate::cache::ResponseCache;
use crate::store::LogStore;

/// Write path for error logs: validates drafts, persists them, and
/// keeps the response cache coherent.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn LogStore>,
    cache: ResponseCache,
}

impl Ingestor {
    pub fn new(store: Arc<dyn LogStore>, cache: ResponseCache) -> Self {
        Self { store, cache }
    }

    /// Validates and persists a batch of drafts, returning the stored
    /// records in submission order.
    ///
    /// The batch goes to the store as one insert, so it either persists
    /// entirely or not at all. The cache is cleared before returning:
    /// a confirmed write is visible to every subsequent read.
    pub async fn ingest(&self, drafts: Vec<ErrorLogDraft>) -> Result<Vec<ErrorLog>> {
        if drafts.is_empty() {
            return Ok(Vec::new());
        }

        for (index, draft) in drafts.iter().enumerate() {
            if draft.message.trim().is_empty() {
                return Err(FaultlineError::ValidationFailed(format!(
                    "log entry {index}: message must not be empty"
                )));
            }
        }

        let received_at = Utc::now();
        let logs = drafts
            .into_iter()
            .map(|draft| draft.into_log(Uuid::new_v4(), received_at))
            .collect();

        let stored = self.store.insert_many(logs).await?;

        self.cache.invalidate_all();
        info!(count = stored.len(), "ingested error logs");

        Ok(stored)
    }

    /// Transitions one record to a new status.
    ///
    /// The raw status string is validated against the enum before the
    /// store is touched; an unknown identifier is `NotFound`. Cache
    /// invalidation mirrors `ingest`.
    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<ErrorLog> {
        let status = LogStatus::parse(status)
            .ok_or_else(|| FaultlineError::InvalidParameter("Invalid status value".to_string()))?;

        let updated = self
            .store
            .update_status_by_id(id, status)
            .await?
            .ok_or_else(|| FaultlineError::NotFound("Log not found".to_string()))?;

        self.cache.invalidate_all();
        info!(%id, status = status.as_str(), "updated log status");

        Ok(updated)
    }
}
