use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExamError>;

#[derive(Error, Debug)]
pub enum ExamError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("block already exists: {0}")]
    BlockExists(String),

    #[error("invalid block name {0:?}: names must be non-empty and contain no whitespace")]
    InvalidBlockName(String),

    #[error("task limit reached for block {block} ({limit})")]
    TaskLimit { block: String, limit: u32 },

    #[error("test duration must be a positive number of seconds, got {0}")]
    InvalidDuration(i64),

    #[error("test {} not found", .0 + 1)]
    TestNotFound(usize),

    #[error("no task {} in the active session", .0 + 1)]
    TaskNotFound(usize),
}
