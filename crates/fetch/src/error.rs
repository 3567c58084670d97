use std::time::Duration;

use sitewatch_browser::BrowserError;

/// Why a single strategy attempt failed. Never fatal on its own; the engine
/// moves on to the next strategy.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("page never became ready: {0}")]
    RenderWait(String),

    #[error("render failed: {0}")]
    Render(String),

    #[error("failed to build http client: {0}")]
    Client(String),

    #[error("no fetch strategies configured")]
    NoStrategies,
}

impl FetchError {
    #[must_use]
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<BrowserError> for FetchError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Timeout(msg) => Self::RenderWait(msg),
            other => Self::Render(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
