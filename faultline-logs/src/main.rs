mod cache;
mod executor;
mod ingest;
mod rate_limit;
mod repository;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{middleware, Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use faultline_core::config::CoreConfig;
use faultline_core::errors::FaultlineError;
use faultline_core::logging;
use faultline_protocol::logs::{ErrorLogDraft, RawLogQuery};

use cache::ResponseCache;
use executor::QueryExecutor;
use ingest::Ingestor;
use rate_limit::{enforce_rate_limit, RateLimitState};
use repository::LogRepository;
use store::LogStore;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    if let Err(err) = logging::init_tracing(None) {
        eprintln!("⚠️ failed to initialise tracing: {err}");
    }

    let config = load_logs_config()?;
    let bind_addr: SocketAddr = config
        .http_bind
        .clone()
        .unwrap_or_else(|| "0.0.0.0:3000".to_string())
        .parse()?;

    let repository = LogRepository::from_config(&config).await?;
    let store: Arc<dyn LogStore> = Arc::new(repository);
    let cache = ResponseCache::new(Duration::from_secs(config.cache_ttl_secs));

    let state = AppState {
        executor: QueryExecutor::new(store.clone(), cache.clone()),
        ingestor: Ingestor::new(store, cache),
    };

    let rate_limit = Arc::new(RateLimitState::new(
        config.rate_limit_per_minute,
        Duration::from_secs(60),
    ));

    let app = build_router(state, rate_limit)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind_addr).await?;
    let actual_addr = listener.local_addr()?;
    info!(%actual_addr, node = %config.node_name, "starting faultline-logs service");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_logs_config() -> Result<CoreConfig, FaultlineError> {
    CoreConfig::from_env_with_prefix("LOGS_")
        .or_else(|_| CoreConfig::from_env())
        .map_err(Into::into)
}

fn build_router(state: AppState, rate_limit: Arc<RateLimitState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/v1/logs", get(list_logs).post(create_logs))
        .route("/v1/logs/:id", patch(update_log_status))
        .layer(middleware::from_fn_with_state(rate_limit, enforce_rate_limit))
        .with_state(state)
}

fn cors_layer(config: &CoreConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    match config
        .frontend_origin
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            warn!("ignoring malformed FRONTEND_ORIGIN value");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

#[derive(Clone)]
struct AppState {
    executor: QueryExecutor,
    ingestor: Ingestor,
}

type AppResult<T> = Result<T, AppError>;

/// Creation accepts a single draft or a batch of them in one request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreateLogsRequest {
    Single(Box<ErrorLogDraft>),
    Batch(Vec<ErrorLogDraft>),
}

impl CreateLogsRequest {
    fn into_drafts(self) -> Vec<ErrorLogDraft> {
        match self {
            CreateLogsRequest::Single(draft) => vec![*draft],
            CreateLogsRequest::Batch(drafts) => drafts,
        }
    }
}

async fn create_logs(
    State(state): State<AppState>,
    Json(payload): Json<CreateLogsRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let stored = state.ingestor.ingest(payload.into_drafts()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": stored })),
    ))
}

async fn list_logs(
    State(state): State<AppState>,
    Query(raw): Query<RawLogQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let query = raw.normalize()?;
    let page = state.executor.execute(&query).await?;

    Ok(Json(json!({
        "status": "success",
        "data": page.data,
        "pagination": page.pagination,
        "cached": page.cached,
    })))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    status: String,
}

async fn update_log_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::bad_request(format!("Invalid log id: {id}")))?;
    let updated = state.ingestor.update_status(id, &payload.status).await?;

    Ok(Json(json!({ "status": "success", "data": updated })))
}

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error("failed to bind logs service: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
    #[error("configuration error: {0}")]
    Config(#[from] FaultlineError),
}

#[derive(Debug, Clone)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request<M: Into<String>>(message: M) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found<M: Into<String>>(message: M) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn unavailable<M: Into<String>>(message: M) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    fn internal<M: Into<String>>(message: M) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "status": "error", "message": self.message }));
        (self.status, body).into_response()
    }
}

impl From<FaultlineError> for AppError {
    fn from(err: FaultlineError) -> Self {
        match err {
            FaultlineError::InvalidParameter(message) => AppError::bad_request(message),
            FaultlineError::ValidationFailed(message) => AppError::bad_request(message),
            FaultlineError::NotFound(message) => AppError::not_found(message),
            FaultlineError::StoreUnavailable(message) => {
                error!(%message, "log store unavailable");
                AppError::unavailable("Service temporarily unavailable")
            }
            other => {
                // Whatever happened stays in the logs; callers get a
                // generic message.
                error!(error = %other, "unhandled internal error");
                AppError::internal("Something went wrong!")
            }
        }
    }
}
