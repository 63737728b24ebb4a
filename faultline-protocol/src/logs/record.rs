use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Severity attached to an error log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Error,
    Warning,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
        }
    }

    /// Parses the wire representation; `None` for anything outside the enum.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "error" => Some(LogLevel::Error),
            "warning" => Some(LogLevel::Warning),
            "info" => Some(LogLevel::Info),
            _ => None,
        }
    }
}

/// Triage state of an error log. The only field that may change after creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    #[default]
    New,
    Acknowledged,
    Resolved,
    Ignored,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::New => "new",
            LogStatus::Acknowledged => "acknowledged",
            LogStatus::Resolved => "resolved",
            LogStatus::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "new" => Some(LogStatus::New),
            "acknowledged" => Some(LogStatus::Acknowledged),
            "resolved" => Some(LogStatus::Resolved),
            "ignored" => Some(LogStatus::Ignored),
            _ => None,
        }
    }
}

/// Persisted error report as stored and served by the service.
///
/// Field names on the wire are part of the client contract and must not
/// change: `message`, `level`, `source`, `stackTrace`, `context`,
/// `browserInfo`, `status`, `serverTimestamp`, `clientTimestamp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLog {
    pub id: Uuid,
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// Open key-value context supplied by the client; arbitrary JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_info: Option<Value>,
    #[serde(default)]
    pub status: LogStatus,
    /// Set by the service at insertion time; never client-controlled.
    pub server_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-submitted payload for creating an error log.
///
/// A `serverTimestamp` supplied by the client is silently dropped on
/// deserialization; the service assigns its own at insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogDraft {
    pub message: String,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_info: Option<Value>,
    #[serde(default)]
    pub status: LogStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<DateTime<Utc>>,
}

impl ErrorLogDraft {
    /// Minimal draft with every optional field unset.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::default(),
            source: None,
            stack_trace: None,
            context: None,
            browser_info: None,
            status: LogStatus::default(),
            client_timestamp: None,
        }
    }

    /// Materializes the draft into a full record using the supplied
    /// server-side timestamp and identifier.
    pub fn into_log(self, id: Uuid, server_timestamp: DateTime<Utc>) -> ErrorLog {
        ErrorLog {
            id,
            message: self.message,
            level: self.level,
            source: self.source,
            stack_trace: self.stack_trace,
            context: self.context,
            browser_info: self.browser_info,
            status: self.status,
            server_timestamp,
            client_timestamp: self.client_timestamp,
            created_at: server_timestamp,
            updated_at: server_timestamp,
        }
    }
}
