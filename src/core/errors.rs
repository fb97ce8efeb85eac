//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Missing credential or invalid setting; aborts the whole dispatch
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Connection refused, DNS failure or broken stream
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout after {seconds}s")]
    TimeoutError {
        seconds: u64,
    },

    /// Backend answered with a non-success HTTP status
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Backend answered 2xx but reported an error in the body
    #[error("API error: {message}")]
    RemoteError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Malformed stream event
    #[error("Parse error: {message}")]
    ParseError {
        message: String,
    },

    /// A worker task panicked or was cancelled
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration source error
    #[error("Config source error: {0}")]
    ConfigSourceError(#[from] config::ConfigError),
}

impl TranslationError {
    /// Shorthand for a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        TranslationError::ConfigError {
            message: message.into(),
        }
    }

    /// Classify a transport failure as timeout or network error
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            TranslationError::TimeoutError {
                seconds: timeout_secs,
            }
        } else {
            TranslationError::NetworkError {
                message: err.to_string(),
            }
        }
    }

    /// Rebuild an equivalent error of the same kind.
    ///
    /// Wrapped library errors are not `Clone`; they become the variant they
    /// would have been classified as.
    pub fn replicate(&self) -> Self {
        match self {
            TranslationError::ConfigError { message } => TranslationError::ConfigError {
                message: message.clone(),
            },
            TranslationError::NetworkError { message } => TranslationError::NetworkError {
                message: message.clone(),
            },
            TranslationError::TimeoutError { seconds } => {
                TranslationError::TimeoutError { seconds: *seconds }
            }
            TranslationError::ApiError { status, message } => TranslationError::ApiError {
                status: *status,
                message: message.clone(),
            },
            TranslationError::RemoteError { message } => TranslationError::RemoteError {
                message: message.clone(),
            },
            TranslationError::InvalidResponseError { message } => {
                TranslationError::InvalidResponseError {
                    message: message.clone(),
                }
            }
            TranslationError::ParseError { message } => TranslationError::ParseError {
                message: message.clone(),
            },
            TranslationError::InternalError(message) => {
                TranslationError::InternalError(message.clone())
            }
            TranslationError::IoError(e) => {
                TranslationError::IoError(std::io::Error::new(e.kind(), e.to_string()))
            }
            TranslationError::HttpError(e) => {
                if e.is_timeout() {
                    TranslationError::TimeoutError { seconds: 0 }
                } else {
                    TranslationError::NetworkError {
                        message: e.to_string(),
                    }
                }
            }
            TranslationError::JsonError(e) => TranslationError::InvalidResponseError {
                message: e.to_string(),
            },
            TranslationError::ConfigSourceError(e) => TranslationError::ConfigError {
                message: e.to_string(),
            },
        }
    }

    /// Whether this error should abort the whole operation instead of a single language
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TranslationError::ConfigError { .. } | TranslationError::ConfigSourceError(_)
        )
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
