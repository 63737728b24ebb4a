use serde::{Deserialize, Serialize};

use super::record::ErrorLog;

/// Pagination metadata attached to every listing response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_logs: u64,
    pub limit: u32,
}

impl Pagination {
    /// Computes the metadata for `total_logs` matches at `limit` per page.
    ///
    /// `total_pages` is zero when nothing matches; a `current_page`
    /// beyond the end is reported as-is alongside the real totals.
    pub fn compute(current_page: u32, limit: u32, total_logs: u64) -> Self {
        let total_pages = if total_logs == 0 {
            0
        } else {
            total_logs.div_ceil(limit as u64) as u32
        };

        Self {
            current_page,
            total_pages,
            total_logs,
            limit,
        }
    }
}

/// One page of records plus its metadata; the value cached and served
/// for a listing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogPage {
    pub data: Vec<ErrorLog>,
    pub pagination: Pagination,
    /// Whether this response was answered from the response cache.
    pub cached: bool,
}
