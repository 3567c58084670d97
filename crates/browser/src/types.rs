//! Launch settings for the headless browser.

use std::time::Duration;

use sitewatch_config::SitewatchConfig;

/// How the render session launches and drives Chromium.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// CDP request timeout, also bounds navigation.
    pub request_timeout: Duration,
    pub user_agent: Option<String>,
    /// Extra Chrome arguments appended after the defaults.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            request_timeout: Duration::from_secs(30),
            user_agent: None,
            chrome_args: Vec::new(),
        }
    }
}

impl From<&SitewatchConfig> for BrowserConfig {
    fn from(cfg: &SitewatchConfig) -> Self {
        Self {
            chrome_path: cfg.render.chrome_path.clone(),
            headless: cfg.render.headless,
            viewport_width: cfg.render.viewport_width,
            viewport_height: cfg.render.viewport_height,
            request_timeout: Duration::from_secs(cfg.render.timeout_secs),
            user_agent: Some(cfg.fetch.user_agent.clone()),
            chrome_args: Vec::new(),
        }
    }
}

/// Page waits applied after navigation.
#[derive(Debug, Clone, Copy)]
pub struct RenderWaits {
    /// Upper bound for `<body>` to exist.
    pub dom_ready: Duration,
    /// Fixed pause once the body exists.
    pub settle: Duration,
}

impl Default for RenderWaits {
    fn default() -> Self {
        Self {
            dom_ready: Duration::from_secs(10),
            settle: Duration::from_secs(2),
        }
    }
}

impl From<&SitewatchConfig> for RenderWaits {
    fn from(cfg: &SitewatchConfig) -> Self {
        Self {
            dom_ready: Duration::from_secs(cfg.render.dom_wait_secs),
            settle: Duration::from_secs(cfg.render.settle_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_from_sitewatch_config() {
        let mut cfg = SitewatchConfig::default();
        cfg.render.chrome_path = Some("/opt/chromium".into());
        cfg.render.dom_wait_secs = 4;

        let browser = BrowserConfig::from(&cfg);
        assert_eq!(browser.chrome_path.as_deref(), Some("/opt/chromium"));
        assert!(browser.user_agent.as_deref().is_some_and(|ua| ua.contains("Chrome/")));

        let waits = RenderWaits::from(&cfg);
        assert_eq!(waits.dom_ready, Duration::from_secs(4));
        assert_eq!(waits.settle, Duration::from_secs(2));
    }
}
