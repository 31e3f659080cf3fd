//! Error types for illustration output

use thiserror::Error;

pub type CanvasResult<T> = Result<T, CanvasError>;

/// Raised only when writing illustrations out; drawing itself never fails.
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scene export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Output(String),
}
