/// Errors raised by the persisted state document and the sample historian.
///
/// A read failure falls back to defaults (the caller, not this error,
/// decides that); a write failure is logged and otherwise non-fatal, since
/// in-memory state stays authoritative for the rest of the run.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state document is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("historian database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("historian CSV export error: {0}")]
    Csv(#[from] csv::Error),

    #[error("query exceeded its timeout budget")]
    QueryTimeout,

    #[error("background task join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
