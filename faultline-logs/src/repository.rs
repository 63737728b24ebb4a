use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use faultline_core::config::CoreConfig;
use faultline_core::db::DatabasePool;
use faultline_core::errors::{FaultlineError, Result};
use faultline_protocol::logs::{ErrorLog, LogLevel, LogQuery, LogStatus, SortField, SortOrder};

use crate::store::LogStore;

const COLUMNS: &str = "id, message, level, source, stack_trace, context, browser_info, \
     status, server_timestamp, client_timestamp, created_at, updated_at";

/// Database-backed repository for error logs.
#[derive(Clone)]
pub struct LogRepository {
    pool: DatabasePool,
}

impl LogRepository {
    /// Connects to the database using the supplied configuration and ensures migrations ran.
    pub async fn from_config(config: &CoreConfig) -> Result<Self> {
        let pool = DatabasePool::connect(config).await?;
        Self::from_pool(pool).await
    }

    /// Builds the repository from an existing database pool.
    pub async fn from_pool(pool: DatabasePool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(pool.inner())
            .await
            .map_err(|err| FaultlineError::InternalError(err.to_string()))?;
        Ok(Self { pool })
    }

    /// Appends the query's filters to a builder whose statement already
    /// ends in `WHERE 1=1`. Shared by `find_page` and `count` so a page
    /// and its total always describe the same predicate.
    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a LogQuery) {
        if let Some(level) = query.level {
            builder.push(" AND level = ");
            builder.push_bind(level.as_str());
        }

        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status.as_str());
        }

        if let Some(source) = &query.source {
            builder.push(" AND source = ");
            builder.push_bind(source);
        }

        if let Some(start) = query.start_date {
            builder.push(" AND server_timestamp >= ");
            builder.push_bind(start);
        }

        if let Some(end) = query.end_date {
            builder.push(" AND server_timestamp <= ");
            builder.push_bind(end);
        }

        if let Some(search) = &query.search {
            let pattern = like_pattern(search);
            builder.push(" AND (message ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR stack_trace ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
    }

    fn sort_column(field: SortField) -> &'static str {
        match field {
            SortField::ServerTimestamp => "server_timestamp",
            SortField::ClientTimestamp => "client_timestamp",
            SortField::Level => "level",
            SortField::Source => "source",
            SortField::Status => "status",
            SortField::Message => "message",
        }
    }
}

/// Escapes LIKE metacharacters and wraps the term for substring matching.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl LogStore for LogRepository {
    async fn insert_many(&self, logs: Vec<ErrorLog>) -> Result<Vec<ErrorLog>> {
        if logs.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::new(
            "INSERT INTO error_logs (id, message, level, source, stack_trace, context, \
             browser_info, status, server_timestamp, client_timestamp, created_at, updated_at) ",
        );

        builder.push_values(logs, |mut row, log| {
            row.push_bind(log.id)
                .push_bind(log.message)
                .push_bind(log.level.as_str())
                .push_bind(log.source)
                .push_bind(log.stack_trace)
                .push_bind(log.context)
                .push_bind(log.browser_info)
                .push_bind(log.status.as_str())
                .push_bind(log.server_timestamp)
                .push_bind(log.client_timestamp)
                .push_bind(log.created_at)
                .push_bind(log.updated_at);
        });

        builder.push(" RETURNING ");
        builder.push(COLUMNS);

        let rows = builder
            .build_query_as::<ErrorLogRow>()
            .fetch_all(self.pool.inner())
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_status_by_id(
        &self,
        id: Uuid,
        status: LogStatus,
    ) -> Result<Option<ErrorLog>> {
        let row = sqlx::query_as::<_, ErrorLogRow>(&format!(
            "UPDATE error_logs SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(self.pool.inner())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_page(&self, query: &LogQuery, skip: i64, limit: i64) -> Result<Vec<ErrorLog>> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM error_logs WHERE 1=1"));

        Self::push_filters(&mut builder, query);

        builder.push(" ORDER BY ");
        builder.push(Self::sort_column(query.sort_by));
        builder.push(match query.order {
            SortOrder::Asc => " ASC",
            SortOrder::Desc => " DESC",
        });
        // Deterministic tie-break keeps pagination stable when the sort
        // field has duplicate values.
        builder.push(", id ASC");

        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(skip);

        let rows = builder
            .build_query_as::<ErrorLogRow>()
            .fetch_all(self.pool.inner())
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, query: &LogQuery) -> Result<i64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM error_logs WHERE 1=1");
        Self::push_filters(&mut builder, query);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.pool.inner())
            .await?;

        Ok(total)
    }
}

#[derive(FromRow)]
struct ErrorLogRow {
    id: Uuid,
    message: String,
    level: String,
    source: Option<String>,
    stack_trace: Option<String>,
    context: Option<Value>,
    browser_info: Option<Value>,
    status: String,
    server_timestamp: DateTime<Utc>,
    client_timestamp: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ErrorLogRow> for ErrorLog {
    fn from(row: ErrorLogRow) -> Self {
        ErrorLog {
            id: row.id,
            message: row.message,
            // The columns carry CHECK constraints matching the enums;
            // fall back to the defaults rather than failing a read.
            level: LogLevel::parse(&row.level).unwrap_or_default(),
            source: row.source,
            stack_trace: row.stack_trace,
            context: row.context,
            browser_info: row.browser_info,
            status: LogStatus::parse(&row.status).unwrap_or_default(),
            server_timestamp: row.server_timestamp,
            client_timestamp: row.client_timestamp,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
