use thiserror::Error;

/// Top-level error type for the Roundtable runtime.
#[derive(Debug, Error)]
pub enum RoundtableError {
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("configuration error ({agent}): {message}")]
    Config { agent: String, message: String },

    #[error("llama-server error: {0}")]
    Backend(String),

    #[error("decision parse error: {0}")]
    Parse(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RoundtableError {
    pub fn invalid_schedule(message: impl Into<String>) -> Self {
        Self::InvalidSchedule(message.into())
    }
}
