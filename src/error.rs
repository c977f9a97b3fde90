use thiserror::Error;

/// Main error type for the fare sweep
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Invalid stay rule: {0}")]
    InvalidStay(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout error: lookup exceeded {0}s")]
    Timeout(u64),

    #[error("Price parse error: '{0}'")]
    PriceParse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid search document at {path}: {message}")]
    Document { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SweepError>;

impl SweepError {
    /// Check if a caller could reasonably retry the operation that produced this error
    pub fn is_retryable(&self) -> bool {
        match self {
            SweepError::Http(err) => err.is_timeout() || err.is_connect(),
            SweepError::Upstream { status, .. } => *status == 429 || *status >= 500,
            SweepError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Get the error code for structured output
    pub fn error_code(&self) -> &'static str {
        match self {
            SweepError::Config(_) => "CONFIG_ERROR",
            SweepError::InvalidDate { .. } => "INVALID_DATE",
            SweepError::InvalidStay(_) => "INVALID_STAY",
            SweepError::InvalidRequest(_) => "INVALID_REQUEST",
            SweepError::Http(_) => "HTTP_ERROR",
            SweepError::Upstream { .. } => "UPSTREAM_ERROR",
            SweepError::InvalidResponse(_) => "INVALID_RESPONSE",
            SweepError::Timeout(_) => "TIMEOUT_ERROR",
            SweepError::PriceParse(_) => "PRICE_PARSE_ERROR",
            SweepError::Serialization(_) => "SERIALIZATION_ERROR",
            SweepError::Document { .. } => "DOCUMENT_ERROR",
            SweepError::Io(_) => "IO_ERROR",
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        })
    }
}
