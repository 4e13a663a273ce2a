use jobhound_browser::BrowserError;
use jobhound_core::{CoreError, FailureReason};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} timed out after {attempts} attempts")]
    NavigationTimeout { url: String, attempts: u32 },

    #[error("login wall at {url}, credentials required")]
    AuthenticationFailed { url: String },

    #[error("challenge `{signature}` was not resolved in time")]
    CaptchaUnresolved { signature: String },

    #[error("scrape cancelled")]
    Cancelled,

    #[error("invalid scrape request: {0}")]
    InvalidRequest(String),

    #[error("invalid selector catalog: {0}")]
    InvalidCatalog(String),

    #[error("card {index} has neither title nor company")]
    EmptyCard { index: usize },

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl ScrapeError {
    /// Session-level failures end the scrape; everything else is counted
    /// against a single card or filter.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NavigationTimeout { .. }
            | Self::AuthenticationFailed { .. }
            | Self::CaptchaUnresolved { .. }
            | Self::Cancelled
            | Self::InvalidRequest(_)
            | Self::InvalidCatalog(_)
            | Self::Core(_) => true,
            Self::Browser(e) => matches!(e, BrowserError::SessionClosed),
            Self::EmptyCard { .. } => false,
        }
    }

    /// The failure reason reported in the scrape result.
    pub fn to_failure_reason(&self) -> FailureReason {
        match self {
            Self::NavigationTimeout { url, attempts } => FailureReason::NavigationTimeout {
                url: url.clone(),
                attempts: *attempts,
            },
            Self::AuthenticationFailed { url } => {
                FailureReason::AuthenticationFailed { url: url.clone() }
            }
            Self::CaptchaUnresolved { signature } => FailureReason::CaptchaUnresolved {
                signature: signature.clone(),
            },
            Self::Cancelled => FailureReason::Cancelled,
            other => FailureReason::Browser {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Swallow element-level browser errors; only a closed session escapes.
pub(crate) fn fatal_only(error: BrowserError) -> Result<()> {
    match error {
        BrowserError::SessionClosed => Err(ScrapeError::Browser(error)),
        other => {
            tracing::debug!("ignoring element error: {}", other);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(ScrapeError::Cancelled.is_fatal());
        assert!(ScrapeError::Browser(BrowserError::SessionClosed).is_fatal());
        assert!(!ScrapeError::Browser(BrowserError::StaleElement(".title".into())).is_fatal());
        assert!(!ScrapeError::EmptyCard { index: 3 }.is_fatal());
    }

    #[test]
    fn test_only_closed_session_escapes() {
        assert!(fatal_only(BrowserError::Timeout("evaluate".into())).is_ok());
        assert!(fatal_only(BrowserError::SelectorNotFound(".next".into())).is_ok());
        assert!(matches!(
            fatal_only(BrowserError::SessionClosed),
            Err(ScrapeError::Browser(BrowserError::SessionClosed))
        ));
    }

    #[test]
    fn test_failure_reason_mapping() {
        let err = ScrapeError::NavigationTimeout {
            url: "https://jobs.example.com".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_failure_reason(),
            FailureReason::NavigationTimeout {
                url: "https://jobs.example.com".to_string(),
                attempts: 3
            }
        );
        assert_eq!(
            ScrapeError::Cancelled.to_failure_reason(),
            FailureReason::Cancelled
        );
        assert!(matches!(
            ScrapeError::Browser(BrowserError::SessionClosed).to_failure_reason(),
            FailureReason::Browser { .. }
        ));
    }
}
