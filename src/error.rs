//! Error types for WattBox client operations

use thiserror::Error;

/// Result type alias for WattBox operations
pub type Result<T> = std::result::Result<T, WattBoxError>;

/// Error types for WattBox PDU communication
#[derive(Error, Debug)]
pub enum WattBoxError {
    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Unexpected HTTP status from the device
    #[error("Unexpected HTTP status {status} from {context}")]
    HttpStatus {
        status: reqwest::StatusCode,
        context: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WattBoxError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an error for an unexpected HTTP status
    pub fn http_status<S: Into<String>>(status: reqwest::StatusCode, context: S) -> Self {
        Self::HttpStatus {
            status,
            context: context.into(),
        }
    }

    /// Create an authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Check if error is retryable (device likely unreachable; back off and retry)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WattBoxError::Connection(_) | WattBoxError::Timeout(_) | WattBoxError::Http(_)
        )
    }

    /// Check if error indicates an authentication/configuration issue
    pub fn is_auth_error(&self) -> bool {
        matches!(self, WattBoxError::Authentication(_))
    }
}
