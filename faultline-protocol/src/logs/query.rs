use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use faultline_core::errors::{FaultlineError, Result};

use super::record::{LogLevel, LogStatus};

/// Hard ceiling for the page size regardless of what the client asks for.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Page size applied when the client does not send one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Fields a listing may be sorted by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    #[serde(rename = "serverTimestamp")]
    #[default]
    ServerTimestamp,
    #[serde(rename = "clientTimestamp")]
    ClientTimestamp,
    #[serde(rename = "level")]
    Level,
    #[serde(rename = "source")]
    Source,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "message")]
    Message,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::ServerTimestamp => "serverTimestamp",
            SortField::ClientTimestamp => "clientTimestamp",
            SortField::Level => "level",
            SortField::Source => "source",
            SortField::Status => "status",
            SortField::Message => "message",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "serverTimestamp" => Some(SortField::ServerTimestamp),
            "clientTimestamp" => Some(SortField::ClientTimestamp),
            "level" => Some(SortField::Level),
            "source" => Some(SortField::Source),
            "status" => Some(SortField::Status),
            "message" => Some(SortField::Message),
            _ => None,
        }
    }
}

/// Sort direction; anything unrecognized falls back to descending.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Query parameters exactly as they arrive on the request line.
///
/// Every field is an optional string so that malformed values reach the
/// normalizer (which reports the offending field) instead of dying
/// inside the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

impl RawLogQuery {
    /// Canonicalizes the raw parameters into a [`LogQuery`].
    ///
    /// Blank parameters count as absent. Malformed values fail with
    /// `InvalidParameter` naming the field, except the sort order,
    /// which falls back to `desc`.
    pub fn normalize(&self) -> Result<LogQuery> {
        let level = match present(&self.level) {
            Some(raw) => Some(
                LogLevel::parse(raw)
                    .ok_or_else(|| FaultlineError::InvalidParameter(format!("level: {raw:?}")))?,
            ),
            None => None,
        };

        let status = match present(&self.status) {
            Some(raw) => Some(
                LogStatus::parse(raw)
                    .ok_or_else(|| FaultlineError::InvalidParameter(format!("status: {raw:?}")))?,
            ),
            None => None,
        };

        let source = present(&self.source).map(str::to_string);
        let search = present(&self.search).map(str::to_string);

        let start_date = parse_timestamp(present(&self.start_date), "startDate")?;
        let end_date = parse_timestamp(present(&self.end_date), "endDate")?;

        let sort_by = match present(&self.sort_by) {
            Some(raw) => SortField::parse(raw)
                .ok_or_else(|| FaultlineError::InvalidParameter(format!("sortBy: {raw:?}")))?,
            None => SortField::default(),
        };

        let order = present(&self.order)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "asc" => SortOrder::Asc,
                _ => SortOrder::Desc,
            })
            .unwrap_or_default();

        let page = match present(&self.page) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| FaultlineError::InvalidParameter(format!("page: {raw:?}")))?
                .clamp(1, i64::from(u32::MAX)) as u32,
            None => 1,
        };

        let limit = match present(&self.limit) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| FaultlineError::InvalidParameter(format!("limit: {raw:?}")))?
                .clamp(1, MAX_PAGE_SIZE as i64) as u32,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(LogQuery {
            level,
            source,
            status,
            start_date,
            end_date,
            search,
            sort_by,
            order,
            page,
            limit,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
}

fn parse_timestamp(value: Option<&str>, field: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = value else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    // Bare dates are accepted as midnight UTC.
    if let Ok(date) = raw.parse::<NaiveDate>() {
        let midnight = date.and_time(NaiveTime::MIN).and_utc();
        return Ok(Some(midnight));
    }

    Err(FaultlineError::InvalidParameter(format!("{field}: {raw:?}")))
}

/// Canonical, fully-defaulted description of a listing request.
///
/// Two requests that mean the same thing normalize to an identical
/// value and therefore to an identical cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogQuery {
    pub level: Option<LogLevel>,
    pub source: Option<String>,
    pub status: Option<LogStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            level: None,
            source: None,
            status: None,
            start_date: None,
            end_date: None,
            search: None,
            sort_by: SortField::default(),
            order: SortOrder::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LogQuery {
    /// Derives the cache key for this query.
    ///
    /// Fields are emitted in a fixed lexicographic order with absent
    /// filters rendered empty, so parameter order and incidental
    /// formatting on the request line cannot fragment the cache. The
    /// canonical string is hashed to keep keys uniform and compact.
    pub fn cache_key(&self) -> String {
        let canonical = format!(
            "endDate={}|level={}|limit={}|order={}|page={}|search={}|sortBy={}|source={}|startDate={}|status={}",
            self.end_date.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            self.level.map(|level| level.as_str()).unwrap_or_default(),
            self.limit,
            self.order.as_str(),
            self.page,
            self.search.as_deref().unwrap_or_default(),
            self.sort_by.as_str(),
            self.source.as_deref().unwrap_or_default(),
            self.start_date.map(|ts| ts.to_rfc3339()).unwrap_or_default(),
            self.status.map(|status| status.as_str()).unwrap_or_default(),
        );

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("logs:{:x}", hasher.finalize())
    }

    /// Renders the query back into raw request parameters.
    pub fn to_raw(&self) -> RawLogQuery {
        RawLogQuery {
            level: self.level.map(|level| level.as_str().to_string()),
            source: self.source.clone(),
            status: self.status.map(|status| status.as_str().to_string()),
            start_date: self.start_date.map(|ts| ts.to_rfc3339()),
            end_date: self.end_date.map(|ts| ts.to_rfc3339()),
            search: self.search.clone(),
            sort_by: Some(self.sort_by.as_str().to_string()),
            order: Some(self.order.as_str().to_string()),
            page: Some(self.page.to_string()),
            limit: Some(self.limit.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_params_absent() {
        let query = RawLogQuery::default().normalize().expect("normalize");
        assert_eq!(query, LogQuery::default());
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query.sort_by, SortField::ServerTimestamp);
        assert_eq!(query.order, SortOrder::Desc);
    }

    #[test]
    fn blank_params_count_as_absent() {
        let raw = RawLogQuery {
            level: Some("  ".to_string()),
            source: Some(String::new()),
            ..Default::default()
        };
        let query = raw.normalize().expect("normalize");
        assert_eq!(query.level, None);
        assert_eq!(query.source, None);
    }

    #[test]
    fn rejects_invalid_enum_values() {
        let raw = RawLogQuery {
            level: Some("fatal".to_string()),
            ..Default::default()
        };
        let err = raw.normalize().unwrap_err();
        assert!(matches!(err, FaultlineError::InvalidParameter(field) if field.contains("level")));

        let raw = RawLogQuery {
            status: Some("closed".to_string()),
            ..Default::default()
        };
        let err = raw.normalize().unwrap_err();
        assert!(matches!(err, FaultlineError::InvalidParameter(field) if field.contains("status")));

        let raw = RawLogQuery {
            sort_by: Some("payload".to_string()),
            ..Default::default()
        };
        let err = raw.normalize().unwrap_err();
        assert!(matches!(err, FaultlineError::InvalidParameter(field) if field.contains("sortBy")));
    }

    #[test]
    fn rejects_non_integer_page_and_limit() {
        let raw = RawLogQuery {
            page: Some("two".to_string()),
            ..Default::default()
        };
        let err = raw.normalize().unwrap_err();
        assert!(matches!(err, FaultlineError::InvalidParameter(field) if field.contains("page")));

        let raw = RawLogQuery {
            limit: Some("1.5".to_string()),
            ..Default::default()
        };
        let err = raw.normalize().unwrap_err();
        assert!(matches!(err, FaultlineError::InvalidParameter(field) if field.contains("limit")));
    }

    #[test]
    fn clamps_page_and_limit() {
        let raw = RawLogQuery {
            page: Some("-3".to_string()),
            limit: Some("5000".to_string()),
            ..Default::default()
        };
        let query = raw.normalize().expect("normalize");
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, MAX_PAGE_SIZE);

        let raw = RawLogQuery {
            limit: Some("0".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.normalize().expect("normalize").limit, 1);
    }

    #[test]
    fn unknown_order_falls_back_to_desc() {
        let raw = RawLogQuery {
            order: Some("sideways".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.normalize().expect("normalize").order, SortOrder::Desc);

        let raw = RawLogQuery {
            order: Some("ASC".to_string()),
            ..Default::default()
        };
        assert_eq!(raw.normalize().expect("normalize").order, SortOrder::Asc);
    }

    #[test]
    fn rejects_unparsable_timestamps() {
        let raw = RawLogQuery {
            start_date: Some("last tuesday".to_string()),
            ..Default::default()
        };
        let err = raw.normalize().unwrap_err();
        assert!(
            matches!(err, FaultlineError::InvalidParameter(field) if field.contains("startDate"))
        );
    }

    #[test]
    fn accepts_bare_dates_as_midnight_utc() {
        let raw = RawLogQuery {
            start_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let query = raw.normalize().expect("normalize");
        assert_eq!(
            query.start_date.map(|ts| ts.to_rfc3339()),
            Some("2024-01-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = RawLogQuery {
            level: Some("warning".to_string()),
            search: Some("TypeError".to_string()),
            start_date: Some("2024-01-01T12:00:00Z".to_string()),
            order: Some("ASC".to_string()),
            page: Some("3".to_string()),
            limit: Some("250".to_string()),
            ..Default::default()
        };
        let once = raw.normalize().expect("normalize");
        let twice = once.to_raw().normalize().expect("re-normalize");
        assert_eq!(once, twice);
        assert_eq!(once.cache_key(), twice.cache_key());
    }

    #[test]
    fn equivalent_requests_share_a_cache_key() {
        // Explicit defaults and absent parameters mean the same request.
        let explicit = RawLogQuery {
            page: Some("1".to_string()),
            limit: Some("20".to_string()),
            order: Some("DESC".to_string()),
            sort_by: Some("serverTimestamp".to_string()),
            ..Default::default()
        };
        let implicit = RawLogQuery::default();
        assert_eq!(
            explicit.normalize().expect("normalize").cache_key(),
            implicit.normalize().expect("normalize").cache_key()
        );

        // Differently-spelled timestamps for the same instant collide too.
        let zulu = RawLogQuery {
            start_date: Some("2024-06-01T00:00:00Z".to_string()),
            ..Default::default()
        };
        let offset = RawLogQuery {
            start_date: Some("2024-06-01T02:00:00+02:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            zulu.normalize().expect("normalize").cache_key(),
            offset.normalize().expect("normalize").cache_key()
        );
    }

    #[test]
    fn distinct_filters_produce_distinct_keys() {
        let base = LogQuery::default();
        let filtered = LogQuery {
            level: Some(LogLevel::Error),
            ..LogQuery::default()
        };
        let paged = LogQuery {
            page: 2,
            ..LogQuery::default()
        };
        assert_ne!(base.cache_key(), filtered.cache_key());
        assert_ne!(base.cache_key(), paged.cache_key());
        assert_ne!(filtered.cache_key(), paged.cache_key());
    }
}
