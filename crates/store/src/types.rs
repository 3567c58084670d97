//! Inputs for the registration helpers used by the CLI.

use sitewatch_common::{Result, types::DEFAULT_CHECK_INTERVAL_HOURS, validate_url};

/// A site to register. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSite {
    pub name: String,
    pub url: String,
    pub keywords: Option<String>,
    pub check_interval_hours: u32,
}

impl NewSite {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let url = url.into();
        validate_url(&url)?;
        if name.trim().is_empty() {
            return Err(sitewatch_common::Error::invalid(
                "site name",
                "must not be empty",
            ));
        }
        Ok(Self {
            name,
            url,
            keywords: None,
            check_interval_hours: DEFAULT_CHECK_INTERVAL_HOURS,
        })
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: Option<String>) -> Self {
        self.keywords = keywords.filter(|k| !k.trim().is_empty());
        self
    }

    #[must_use]
    pub fn with_interval_hours(mut self, hours: u32) -> Self {
        self.check_interval_hours = hours;
        self
    }
}

/// A subscriber to register. `None` flags take the defaults (email on,
/// LINE off).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSubscriber {
    pub email: Option<String>,
    pub line_user_id: Option<String>,
    pub email_enabled: Option<bool>,
    pub line_enabled: Option<bool>,
}

impl NewSubscriber {
    pub(crate) fn email_enabled(&self) -> bool {
        self.email_enabled.unwrap_or(true)
    }

    pub(crate) fn line_enabled(&self) -> bool {
        self.line_enabled.unwrap_or(false)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_site_validates() {
        assert!(NewSite::new("docs", "https://example.com/docs").is_ok());
        assert!(NewSite::new("docs", "mailto:a@b").is_err());
        assert!(NewSite::new("  ", "https://example.com").is_err());
    }

    #[test]
    fn blank_keywords_become_none() {
        let site = NewSite::new("a", "https://example.com")
            .unwrap()
            .with_keywords(Some(" ".into()));
        assert_eq!(site.keywords, None);
    }

    #[test]
    fn subscriber_flag_defaults() {
        let sub = NewSubscriber::default();
        assert!(sub.email_enabled());
        assert!(!sub.line_enabled());
    }
}
