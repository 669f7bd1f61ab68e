use thiserror::Error;

#[derive(Debug, Error)]
pub enum NovaError {
    #[error("Model request failed: {0}")]
    LlmRequest(String),

    #[error("Model stream interrupted: {0}")]
    LlmStream(String),

    #[error("Could not parse model output: {0}")]
    LlmParse(String),

    #[error("Routing failed: {0}")]
    Routing(String),

    #[error("Tool input invalid: {0}")]
    ToolValidation(String),

    #[error("Config invalid: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Storage error: {0}")]
    Database(String),

    // Anything that escaped the layers above
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NovaError>;
