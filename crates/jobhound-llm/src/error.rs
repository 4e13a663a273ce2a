use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("unknown LLM provider `{0}`")]
    UnknownProvider(String),

    #[error("{provider} needs an API key, set {env_var}")]
    MissingApiKey { provider: String, env_var: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} rate limited the request: {body}")]
    RateLimited { provider: String, body: String },

    #[error("{provider} rejected the credentials: {body}")]
    Unauthorized { provider: String, body: String },

    #[error("cannot reach {provider}: {message}")]
    Unreachable { provider: String, message: String },

    #[error("unexpected response from {provider}: {message}")]
    Malformed { provider: String, message: String },

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl LlmError {
    /// Whether sending the same prompt again may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_provider() {
        let err = LlmError::Status {
            provider: "anthropic".to_string(),
            status: 529,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "anthropic returned HTTP 529: overloaded");
        assert!(err.is_transient());

        let err = LlmError::MissingApiKey {
            provider: "openai".to_string(),
            env_var: "OPENAI_API_KEY".to_string(),
        };
        assert!(err.to_string().contains("OPENAI_API_KEY"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_client_errors_are_final() {
        let err = LlmError::Status {
            provider: "openai".to_string(),
            status: 400,
            body: String::new(),
        };
        assert!(!err.is_transient());
        assert!(!LlmError::Unauthorized {
            provider: "openai".to_string(),
            body: String::new(),
        }
        .is_transient());
        assert!(LlmError::Timeout { seconds: 60 }.is_transient());
    }
}
