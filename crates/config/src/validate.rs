//! Configuration validation.
//!
//! Parses a config file, flags unknown or misspelled keys, and runs semantic
//! checks on the typed config (strategy chain, time zone, channel
//! credentials).

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use sitewatch_common::StrategyKind;

use crate::{loader, schema::SitewatchConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "fetch", "render",
    /// "notifications", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "fetch.strategies"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let leaves = |keys: &[&'static str]| Struct(keys.iter().map(|k| (*k, Leaf)).collect());

    Struct(HashMap::from([
        ("database", leaves(&["url", "max_connections"])),
        (
            "fetch",
            leaves(&[
                "strategies",
                "timeout_secs",
                "max_redirects",
                "max_body_bytes",
                "user_agent",
                "accept_language",
                "accept_invalid_certs",
            ]),
        ),
        (
            "render",
            leaves(&[
                "enabled",
                "chrome_path",
                "headless",
                "dom_wait_secs",
                "settle_secs",
                "timeout_secs",
                "viewport_width",
                "viewport_height",
            ]),
        ),
        (
            "monitor",
            leaves(&[
                "inter_site_delay_ms",
                "history_window",
                "preview_chars",
                "only_due",
            ]),
        ),
        (
            "notifications",
            Struct(HashMap::from([
                ("locale", Leaf),
                ("timezone", Leaf),
                ("subject", Leaf),
                (
                    "email",
                    leaves(&[
                        "enabled",
                        "sender",
                        "client_id",
                        "client_secret",
                        "refresh_token",
                        "token_url",
                        "api_base",
                        "timeout_secs",
                    ]),
                ),
                (
                    "line",
                    leaves(&["enabled", "channel_access_token", "api_base", "timeout_secs"]),
                ),
            ])),
        ),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered one if `path`
/// is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match loader::load_config_value(&actual_path) {
        Ok(value) => validate_value(&value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                e.to_string(),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(actual_path);
    result
}

/// Validate raw TOML without touching the filesystem.
#[must_use]
pub fn validate_toml_str(raw: &str) -> ValidationResult {
    match loader::parse_config_value(raw, Path::new("inline.toml")) {
        Ok(value) => validate_value(&value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                e.to_string(),
            )],
            config_path: None,
        },
    }
}

fn validate_value(value: &serde_json::Value) -> ValidationResult {
    let mut diagnostics = Vec::new();

    check_unknown_fields(value, &build_schema_map(), "", &mut diagnostics);

    match serde_json::from_value::<SitewatchConfig>(value.clone()) {
        // Credentials commonly arrive through the environment.
        Ok(config) => check_semantics(&loader::apply_env_overrides(config), &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known: Vec<&str> = fields.keys().copied().collect();
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match fields.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            },
        }
    }
}

fn check_semantics(config: &SitewatchConfig, diagnostics: &mut Vec<Diagnostic>) {
    let strategies = &config.fetch.strategies;
    if strategies.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "fetch",
            "fetch.strategies",
            "at least one strategy is required",
        ));
    }
    let mut seen = HashSet::new();
    for s in strategies {
        if !seen.insert(*s) {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "fetch",
                "fetch.strategies",
                format!("strategy \"{s}\" is listed more than once"),
            ));
        }
    }
    if !strategies.is_empty() && config.effective_strategies().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "render",
            "render.enabled",
            "the only configured strategy is rendered-browser but rendering is disabled",
        ));
    } else if strategies.contains(&StrategyKind::RenderedBrowser) && !config.render.enabled {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "render",
            "render.enabled",
            "rendered-browser is listed but rendering is disabled; it will be skipped",
        ));
    }
    if config.fetch.timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "fetch",
            "fetch.timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.render.enabled && config.render.timeout_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "render",
            "render.timeout_secs",
            "must be greater than zero",
        ));
    }
    if config.render.enabled
        && config.render.dom_wait_secs + config.render.settle_secs > config.render.timeout_secs
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "render",
            "render.timeout_secs",
            "shorter than dom_wait_secs + settle_secs; renders will time out",
        ));
    }
    if config.monitor.history_window < 2 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "monitor",
            "monitor.history_window",
            "change detection needs at least two records",
        ));
    }

    if config
        .notifications
        .timezone
        .parse::<chrono_tz::Tz>()
        .is_err()
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "notifications",
            "notifications.timezone",
            format!("unknown time zone \"{}\"", config.notifications.timezone),
        ));
    }

    let email = &config.notifications.email;
    if email.enabled && !email.has_credentials() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "notifications",
            "notifications.email",
            "email is enabled but client_id, client_secret or refresh_token is missing",
        ));
    }
    if email.enabled && email.sender.is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "notifications",
            "notifications.email.sender",
            "no sender address; the From header will be omitted",
        ));
    }
    let line = &config.notifications.line;
    if line.enabled && !line.has_token() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "notifications",
            "notifications.line.channel_access_token",
            "LINE is enabled but no channel access token is set",
        ));
    }
    if !email.enabled && !line.enabled {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "notifications",
            "notifications",
            "no notification channel is enabled; changes will only be logged",
        ));
    }
}
