//! Records shared between the fetch, store, monitor and channel crates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type SiteId = i64;
pub type SubscriberId = i64;

/// Hours between checks when a site does not set its own interval.
pub const DEFAULT_CHECK_INTERVAL_HOURS: u32 = 24;

// ── Site ────────────────────────────────────────────────────────────────────

/// A monitored web page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub url: String,
    /// Comma-delimited keyword list, as configured by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_interval")]
    pub check_interval_hours: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u32 {
    DEFAULT_CHECK_INTERVAL_HOURS
}

impl Site {
    /// Build an active, never-checked site. The URL must be absolute `http` or
    /// `https`.
    pub fn new(id: SiteId, name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::invalid("site name", "must not be empty"));
        }
        Ok(Self {
            id,
            name,
            url,
            keywords: None,
            active: true,
            check_interval_hours: DEFAULT_CHECK_INTERVAL_HOURS,
            last_checked_ms: None,
        })
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        let keywords = keywords.into();
        self.keywords = (!keywords.trim().is_empty()).then_some(keywords);
        self
    }

    #[must_use]
    pub fn with_interval_hours(mut self, hours: u32) -> Self {
        self.check_interval_hours = hours;
        self
    }

    /// Whether the site's check interval has elapsed at `now_ms`. Sites never
    /// checked are always due.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_checked_ms {
            None => true,
            Some(last) => {
                let interval_ms = u64::from(self.check_interval_hours) * 3_600_000;
                now_ms.saturating_sub(last) >= interval_ms
            },
        }
    }
}

/// Reject anything that is not an absolute `http`/`https` URL with a host.
pub fn validate_url(raw: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(raw).map_err(|e| Error::invalid_url(raw, e))?;
    match parsed.scheme() {
        "http" | "https" => {},
        other => {
            return Err(Error::invalid_url(
                raw,
                format!("unsupported scheme '{other}'"),
            ));
        },
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::invalid_url(raw, "missing host"));
    }
    Ok(parsed)
}

// ── Fingerprint ─────────────────────────────────────────────────────────────

/// Lowercase hex digest of a page's canonical text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a digest that was computed elsewhere (e.g. read back from storage).
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let hex = hex.into();
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::invalid("fingerprint", format!("not a hex digest: {hex}")));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Hex-encode raw digest bytes.
    pub fn from_digest(digest: &[u8]) -> Self {
        use std::fmt::Write;

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Strategy ────────────────────────────────────────────────────────────────

/// A retrieval method, in cost-ascending order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    DirectHttp,
    AsyncHttp,
    RenderedBrowser,
}

impl StrategyKind {
    pub const ALL: [Self; 3] = [Self::DirectHttp, Self::AsyncHttp, Self::RenderedBrowser];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectHttp => "direct-http",
            Self::AsyncHttp => "async-http",
            Self::RenderedBrowser => "rendered-browser",
        }
    }

    /// Whether the body is already client-rendered text rather than markup.
    pub fn yields_rendered_text(self) -> bool {
        matches!(self, Self::RenderedBrowser)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::invalid("strategy", format!("unknown strategy '{s}'")))
    }
}

// ── Check records ───────────────────────────────────────────────────────────

/// One persisted observation of a site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRecord {
    /// Assigned by the store on append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub site_id: SiteId,
    /// `None` when the fetch failed.
    pub fingerprint: Option<Fingerprint>,
    pub content_length: u64,
    pub status_code: u16,
    pub latency_ms: u64,
    pub keyword_matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub created_at_ms: u64,
}

impl CheckRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn succeeded(
        site_id: SiteId,
        fingerprint: Fingerprint,
        content_length: u64,
        status_code: u16,
        latency_ms: u64,
        keyword_matched: bool,
        strategy: StrategyKind,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: None,
            site_id,
            fingerprint: Some(fingerprint),
            content_length,
            status_code,
            latency_ms,
            keyword_matched,
            strategy: Some(strategy),
            created_at_ms,
        }
    }

    pub fn failed(
        site_id: SiteId,
        status_code: u16,
        strategy: Option<StrategyKind>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id: None,
            site_id,
            fingerprint: None,
            content_length: 0,
            status_code,
            latency_ms: 0,
            keyword_matched: false,
            strategy,
            created_at_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.fingerprint.is_some()
    }
}

// ── Change classification ───────────────────────────────────────────────────

/// Language used for user-facing labels and messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ja,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    NoChange,
    Content,
    KeywordAppeared,
    KeywordDisappeared,
    InsufficientData,
}

impl ChangeKind {
    pub fn is_change(self) -> bool {
        matches!(
            self,
            Self::Content | Self::KeywordAppeared | Self::KeywordDisappeared
        )
    }

    pub fn label(self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::NoChange, Locale::En) => "No changes detected",
            (Self::Content, Locale::En) => "Content has changed",
            (Self::KeywordAppeared, Locale::En) => "Keywords appeared",
            (Self::KeywordDisappeared, Locale::En) => "Keywords disappeared",
            (Self::InsufficientData, Locale::En) => "Not enough data for comparison",
            (Self::NoChange, Locale::Ja) => "変更はありません",
            (Self::Content, Locale::Ja) => "ページコンテンツが変更されました",
            (Self::KeywordAppeared, Locale::Ja) => "新しいキーワードが検出されました",
            (Self::KeywordDisappeared, Locale::Ja) => "キーワードが削除されました",
            (Self::InsufficientData, Locale::Ja) => "比較に必要なデータが不足しています",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label(Locale::En))
    }
}

/// Outcome of comparing the two most recent successful checks of a site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeResult {
    pub has_changed: bool,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_fingerprint: Option<Fingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_fingerprint: Option<Fingerprint>,
    pub current_keyword: bool,
    pub previous_keyword: bool,
}

impl ChangeResult {
    pub fn insufficient_data() -> Self {
        Self {
            has_changed: false,
            kind: ChangeKind::InsufficientData,
            current_fingerprint: None,
            previous_fingerprint: None,
            current_keyword: false,
            previous_keyword: false,
        }
    }
}

// ── Change history ──────────────────────────────────────────────────────────

/// How much attention a recorded difference deserves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ChangeSeverity {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ChangeSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeSeverity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| Error::invalid("severity", format!("unknown severity '{s}'")))
    }
}

/// Which property of a page differed between two checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAspect {
    Content,
    Keywords,
    /// HTTP status code.
    Status,
    /// The fetch started or stopped failing.
    Availability,
}

impl ChangeAspect {
    pub const ALL: [Self; 4] = [Self::Content, Self::Keywords, Self::Status, Self::Availability];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Keywords => "keywords",
            Self::Status => "status",
            Self::Availability => "availability",
        }
    }
}

impl fmt::Display for ChangeAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeAspect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| Error::invalid("change aspect", format!("unknown aspect '{s}'")))
    }
}

/// One entry of a site's append-only change history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub site_id: SiteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_check_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_check_id: Option<i64>,
    pub aspect: ChangeAspect,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub severity: ChangeSeverity,
    pub detected_at_ms: u64,
}

// ── Subscribers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscriber {
    pub id: SubscriberId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// LINE user id for push messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_user_id: Option<String>,
    #[serde(default = "default_true")]
    pub email_enabled: bool,
    #[serde(default)]
    pub line_enabled: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Subscriber {
    /// Email on, LINE off, active.
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            email: None,
            line_user_id: None,
            email_enabled: true,
            line_enabled: false,
            active: true,
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_line(mut self, line_user_id: impl Into<String>) -> Self {
        self.line_user_id = Some(line_user_id.into());
        self.line_enabled = true;
        self
    }

    /// The destination for `channel`, if the user enabled it and supplied one.
    pub fn destination(&self, channel: ChannelKind) -> Option<&str> {
        let (enabled, dest) = match channel {
            ChannelKind::Email => (self.email_enabled, self.email.as_deref()),
            ChannelKind::Line => (self.line_enabled, self.line_user_id.as_deref()),
            ChannelKind::Log => (true, Some("log")),
        };
        dest.filter(|d| enabled && !d.trim().is_empty())
    }
}

// ── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Line,
    Log,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Line => "line",
            Self::Log => "log",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(Self::Email),
            "line" => Ok(Self::Line),
            "log" => Ok(Self::Log),
            other => Err(Error::invalid("channel", format!("unknown channel '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

/// One channel attempt for one subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub subscriber_id: SubscriberId,
    pub site_id: SiteId,
    pub channel: ChannelKind,
    pub message: String,
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at_ms: u64,
}
