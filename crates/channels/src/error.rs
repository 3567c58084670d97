use std::error::Error as StdError;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a notification could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The subscriber's address or user id cannot be sent to.
    #[error("invalid destination '{destination}': {reason}")]
    InvalidDestination { destination: String, reason: String },

    /// Credentials or tokens are missing.
    #[error("channel not configured: {message}")]
    NotConfigured { message: String },

    /// The remote API answered with a non-success status.
    #[error("{service} request failed ({status}): {body}")]
    Rejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The request never got an answer (connect, TLS, timeout, bad JSON).
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn invalid_destination(
        destination: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidDestination {
            destination: destination.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn not_configured(message: impl std::fmt::Display) -> Self {
        Self::NotConfigured {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn rejected(service: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            service,
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rejected { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidDestination { .. } | Self::NotConfigured { .. } => false,
        }
    }
}
