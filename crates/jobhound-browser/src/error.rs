use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("stale element for selector {0}")]
    StaleElement(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("browser session already closed")]
    SessionClosed,
}

impl BrowserError {
    /// Classify a CDP error raised while working with elements matched by `selector`.
    pub(crate) fn from_cdp(err: &chromiumoxide::error::CdpError, selector: &str) -> Self {
        let message = err.to_string();
        if is_stale_message(&message) {
            Self::StaleElement(selector.to_string())
        } else {
            Self::ChromiumError(message)
        }
    }

    /// Whether a local retry may succeed.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleElement(_))
    }

    /// Whether the session-level navigation retry applies.
    pub fn is_navigation_timeout(&self) -> bool {
        matches!(self, Self::NavigationTimeout { .. })
    }
}

fn is_stale_message(message: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "Could not find node",
        "No node with given id",
        "Node is detached",
        "Cannot find context",
        "does not belong to the document",
    ];
    MARKERS.iter().any(|m| message.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");

        let err = BrowserError::NavigationTimeout {
            url: "https://jobs.example.com".to_string(),
            timeout_secs: 30,
        };
        assert!(err.to_string().contains("timed out after 30s"));
    }

    #[test]
    fn test_stale_classification() {
        assert!(is_stale_message(
            "Error -32000: No node with given id found"
        ));
        assert!(is_stale_message("Node is detached from document"));
        assert!(!is_stale_message("Target closed"));
        assert!(BrowserError::StaleElement(".title".to_string()).is_stale());
        assert!(!BrowserError::SelectorNotFound(".title".to_string()).is_stale());
    }
}
