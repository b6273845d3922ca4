//! Error types for catalog imports.
//!
//! Failures come in two tiers. [`ImportError`] aborts a whole import call and
//! no summary is produced. [`RecordError`] is raised while normalizing or
//! upserting a single record; the import loop counts it, describes it in the
//! summary messages and moves on to the next record.

/// Batch-level failure: the import call returns no summary.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unknown import source: {0}")]
    UnknownSource(String),

    #[error("{source_key} import requires a set code")]
    MissingSetCode { source_key: String },

    #[error("{0} does not support remote import")]
    RemoteUnsupported(String),

    #[error("import cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid payload: {0}")]
    Payload(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Record-level failure, isolated to the offending record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("collector number is blank")]
    BlankNumber,

    #[error("invalid {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("unreadable row at line {line}: {message}")]
    Unreadable { line: u64, message: String },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
