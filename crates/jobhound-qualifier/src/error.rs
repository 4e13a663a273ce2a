//! Scoring provider errors.

use jobhound_llm::LlmError;
use thiserror::Error;

/// Failure of a single scoring call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The call did not finish in time
    #[error("scoring request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed
        seconds: u64,
    },

    /// The provider asked us to slow down
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The provider failed internally
    #[error("provider server error (status {status}): {message}")]
    Server {
        /// HTTP status, 0 when not HTTP
        status: u16,
        /// Error message
        message: String,
    },

    /// The provider cannot be used at all
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Credentials were rejected
    #[error("provider authentication failed: {0}")]
    Authentication(String),

    /// The response did not contain a usable score
    #[error("malformed scoring response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether another attempt may succeed.
    ///
    /// Malformed responses count as transient: models occasionally break
    /// format and a second sample usually parses.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::RateLimited(_) | Self::Server { .. } | Self::Malformed(_)
        )
    }
}

impl From<LlmError> for ProviderError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout { seconds } => Self::Timeout { seconds },
            LlmError::RateLimited { body, .. } => Self::RateLimited(body),
            LlmError::Unauthorized { body, .. } => Self::Authentication(body),
            LlmError::Status { status, body, .. } if status >= 500 => Self::Server {
                status,
                message: body,
            },
            LlmError::Transport(e) => Self::Server {
                status: 0,
                message: e.to_string(),
            },
            LlmError::Malformed { message, .. } => Self::Malformed(message),
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Result type alias for scoring calls.
pub type Result<T> = std::result::Result<T, ProviderError>;
