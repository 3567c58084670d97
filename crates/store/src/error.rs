use sitewatch_common::{FromMessage, SiteId, SubscriberId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Invalid(#[from] sitewatch_common::Error),

    #[error("site not found: {site_id}")]
    SiteNotFound { site_id: SiteId },

    #[error("subscriber not found: {subscriber_id}")]
    SubscriberNotFound { subscriber_id: SubscriberId },

    #[error("{message}")]
    Message { message: String },

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn site_not_found(site_id: SiteId) -> Self {
        Self::SiteNotFound { site_id }
    }

    #[must_use]
    pub fn subscriber_not_found(subscriber_id: SubscriberId) -> Self {
        Self::SubscriberNotFound { subscriber_id }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

sitewatch_common::impl_context!();
