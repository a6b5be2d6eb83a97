use chrono::{DateTime, Utc};
use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    /// Any failure reported by the storage collaborator, propagated as-is
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("Invalid time window: end {end} is before start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Malformed history payload: {len} bytes is not a whole number of records")]
    MalformedPayload { len: usize },

    #[error("Timestamp out of range in history payload: {0}")]
    TimestampOutOfRange(i64),

    #[error("Device workflow panicked: {0}")]
    WorkflowPanicked(String),

    #[error("Device workflow was aborted: {0}")]
    WorkflowAborted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Population failed for {failed} of {total} devices")]
    PopulationFailed { failed: usize, total: usize },
}
