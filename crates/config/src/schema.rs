//! Config schema types (database, fetch, render, monitor, notifications).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    sitewatch_common::{Locale, StrategyKind},
};

/// Browser-like user agent sent by the HTTP strategies and the renderer.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                                      (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SitewatchConfig {
    pub database: DatabaseConfig,
    pub fetch: FetchConfig,
    pub render: RenderConfig,
    pub monitor: MonitorConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://sitewatch.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

/// Network fetch settings shared by the HTTP strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Strategy order, cheapest first.
    pub strategies: Vec<StrategyKind>,
    /// Total budget per network strategy attempt.
    pub timeout_secs: u64,
    pub max_redirects: usize,
    /// Body cap for both HTTP strategies.
    pub max_body_bytes: usize,
    pub user_agent: String,
    pub accept_language: String,
    /// Accept broken TLS certificates on the direct strategy.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::ALL.to_vec(),
            timeout_secs: 30,
            max_redirects: 10,
            max_body_bytes: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.into(),
            accept_language: "ja,en-US;q=0.7,en;q=0.3".into(),
            accept_invalid_certs: true,
        }
    }
}

/// Headless Chromium settings for the rendering strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// When false the rendering strategy is left out of the chain.
    pub enabled: bool,
    /// Explicit browser binary; auto-detected when unset.
    pub chrome_path: Option<String>,
    pub headless: bool,
    /// Upper bound for `<body>` to appear after navigation.
    pub dom_wait_secs: u64,
    /// Pause after the DOM is ready so client scripts can settle.
    pub settle_secs: u64,
    /// Total budget for one rendering attempt.
    pub timeout_secs: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chrome_path: None,
            headless: true,
            dom_wait_secs: 10,
            settle_secs: 2,
            timeout_secs: 45,
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Pause between consecutive sites in a batch.
    pub inter_site_delay_ms: u64,
    /// Number of recent check records handed to change detection.
    pub history_window: u32,
    /// Length of the text preview kept in batch summaries.
    pub preview_chars: usize,
    /// Skip sites whose check interval has not elapsed.
    pub only_due: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            inter_site_delay_ms: 2_000,
            history_window: 10,
            preview_chars: 200,
            only_due: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub locale: Locale,
    /// IANA zone used for the detection timestamp, e.g. "Asia/Tokyo".
    pub timezone: String,
    pub subject: String,
    pub email: EmailConfig,
    pub line: LineConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            locale: Locale::Ja,
            timezone: "Asia/Tokyo".into(),
            subject: "Website Update Detected".into(),
            email: EmailConfig::default(),
            line: LineConfig::default(),
        }
    }
}

/// Gmail REST API credentials (OAuth2 refresh-token flow).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    /// Address placed in the `From:` header.
    pub sender: Option<String>,
    pub client_id: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub client_secret: Option<Secret<String>>,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<Secret<String>>,
    pub token_url: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sender: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
            token_url: "https://oauth2.googleapis.com/token".into(),
            api_base: "https://gmail.googleapis.com".into(),
            timeout_secs: 30,
        }
    }
}

impl EmailConfig {
    /// Whether every credential needed to send is present.
    pub fn has_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(|s| !s.is_empty())
            && self
                .client_secret
                .as_ref()
                .is_some_and(|s| !s.expose_secret().is_empty())
            && self
                .refresh_token
                .as_ref()
                .is_some_and(|s| !s.expose_secret().is_empty())
    }
}

/// LINE Messaging API push settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub enabled: bool,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_access_token: Option<Secret<String>>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_access_token: None,
            api_base: "https://api.line.me".into(),
            timeout_secs: 30,
        }
    }
}

impl LineConfig {
    pub fn has_token(&self) -> bool {
        self.channel_access_token
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty())
    }
}

impl SitewatchConfig {
    /// The strategy chain after applying `render.enabled`.
    pub fn effective_strategies(&self) -> Vec<StrategyKind> {
        self.fetch
            .strategies
            .iter()
            .copied()
            .filter(|s| self.render.enabled || *s != StrategyKind::RenderedBrowser)
            .collect()
    }

    /// Parse the configured zone, falling back to UTC.
    pub fn timezone(&self) -> chrono_tz::Tz {
        self.notifications
            .timezone
            .parse()
            .unwrap_or(chrono_tz::Tz::UTC)
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}
