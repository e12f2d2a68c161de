use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid view mode: {0} (expected comparative, planned_only or actual_only)")]
    InvalidViewMode(String),

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("API reported failure: {0}")]
    Api(String),

    #[error("Unknown project: {0}")]
    UnknownProject(i64),

    #[error("Unknown budget item: {0}")]
    UnknownItem(i64),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BudgetError>;
