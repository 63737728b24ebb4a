pub mod logs;

pub mod prelude {
    pub use crate::logs::{
        ErrorLog, ErrorLogDraft, LogLevel, LogPage, LogQuery, LogStatus, Pagination, RawLogQuery,
        SortField, SortOrder,
    };
}
