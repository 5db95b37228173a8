// Error taxonomy for the rendering-resource subsystem.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SeoError {
    #[error("cache pool empty for group {group_id}")]
    CachePoolEmpty { group_id: i64 },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid pool configuration: {0}")]
    ConfigInvalid(String),

    #[error("update batch channel full, task dropped")]
    UpdateBatchFull,

    #[error("template error: {0}")]
    Template(String),

    #[error("site not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SeoError>;
