/// Why one site's pipeline stopped early.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{stage}: {source}")]
    Persistence {
        stage: Stage,
        #[source]
        source: sitewatch_store::Error,
    },

    #[error("pipeline panicked: {message}")]
    Panicked { message: String },

    #[error("failed to load sites: {0}")]
    LoadSites(#[source] sitewatch_store::Error),
}

/// Pipeline step, for logs and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    AppendRecord,
    UpdateLastChecked,
    LoadHistory,
    LoadSubscribers,
    RecordNotification,
    RecordChange,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::AppendRecord => "append_check_record",
            Self::UpdateLastChecked => "update_last_checked",
            Self::LoadHistory => "load_history",
            Self::LoadSubscribers => "load_subscribers",
            Self::RecordNotification => "record_notification",
            Self::RecordChange => "record_change",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    #[must_use]
    pub fn persistence(stage: Stage, source: sitewatch_store::Error) -> Self {
        Self::Persistence { stage, source }
    }

    /// Turn a caught panic payload into an error.
    #[must_use]
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked { message }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Persistence { stage, .. } => Some(*stage),
            Self::Panicked { .. } | Self::LoadSites(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_readable() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert!(matches!(Error::panicked(boxed.as_ref()), Error::Panicked { message } if message == "static message"));
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert!(matches!(Error::panicked(boxed.as_ref()), Error::Panicked { message } if message == "owned"));
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert!(matches!(Error::panicked(boxed.as_ref()), Error::Panicked { .. }));
    }

    #[test]
    fn persistence_error_names_stage() {
        let err = Error::persistence(
            Stage::AppendRecord,
            sitewatch_store::Error::message("disk full"),
        );
        assert_eq!(err.to_string(), "append_check_record: disk full");
        assert_eq!(err.stage(), Some(Stage::AppendRecord));
    }
}
