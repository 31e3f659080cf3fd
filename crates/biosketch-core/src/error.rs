//! Error types for the BioSketch core

use thiserror::Error;

/// Result type alias for core operations
pub type SketchResult<T> = Result<T, SketchError>;

/// Errors raised by the classifier, the chat client and configuration loading.
///
/// None of these reach the user as-is: the session controller logs them and
/// substitutes a canned reply. Only [`SketchError::MissingApiKey`] is fatal.
#[derive(Error, Debug)]
pub enum SketchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing API key: set OPENAI_API_KEY (or BIOSKETCH_API_KEY) to use the {0} mode")]
    MissingApiKey(String),

    #[error("Chat request failed: {0}")]
    Chat(String),

    #[error("Chat API error {status}: {body}")]
    ChatStatus { status: u16, body: String },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SketchError {
    fn from(err: reqwest::Error) -> Self {
        SketchError::Chat(err.to_string())
    }
}

impl From<config::ConfigError> for SketchError {
    fn from(err: config::ConfigError) -> Self {
        SketchError::Config(err.to_string())
    }
}
