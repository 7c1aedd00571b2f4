//! Error types for the Ishy client.

use thiserror::Error;

/// Input rejected locally, before any request is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The identifier was empty or contained something other than decimal digits.
    #[error("Please enter a valid user ID (numbers only)")]
    InvalidIdentityFormat,

    /// The trimmed nickname is outside the accepted length range.
    #[error("Nickname must be {min}-{max} characters (got {len})")]
    InvalidNicknameLength {
        /// Trimmed length in characters.
        len: usize,
        /// Minimum accepted length.
        min: usize,
        /// Maximum accepted length.
        max: usize,
    },
}

/// A failed call to the Ishy API.
///
/// Produced for transport failures, non-success HTTP statuses, and response
/// bodies that cannot be parsed. The message is suitable for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    /// Human-readable message, taken from the server's `detail` field when present.
    pub message: String,
    /// HTTP status code. `None` when the request never produced a response.
    pub status_code: Option<u16>,
}

impl ApiError {
    /// Error for a request that failed before a response arrived.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    /// Error for a non-success HTTP status.
    ///
    /// Uses the server-supplied detail when available, otherwise the generic
    /// `API error: {status}` text.
    pub fn status(status_code: u16, detail: Option<String>) -> Self {
        let message = detail
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("API error: {status_code}"));
        Self {
            message,
            status_code: Some(status_code),
        }
    }
}

/// Errors that can occur when using the Ishy client.
#[derive(Debug, Error)]
pub enum IshyError {
    /// Input was rejected before reaching the network.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Another action is still in flight.
    #[error("an action is already in progress")]
    Busy,

    /// A personalized command was issued before an identity was captured.
    #[error("no user ID has been set")]
    NoIdentity,

    /// A nickname was submitted while the nickname modal was closed.
    #[error("the nickname modal is not open")]
    NicknameModalClosed,

    /// The controller has been disposed.
    #[error("controller has been disposed")]
    Disposed,

    /// The durable identity storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Failed to serialize or deserialize a payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Ishy client operations.
pub type Result<T> = std::result::Result<T, IshyError>;
