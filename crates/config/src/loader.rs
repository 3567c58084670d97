use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::SitewatchConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "sitewatch.toml",
    "sitewatch.yaml",
    "sitewatch.yml",
    "sitewatch.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SitewatchConfig> {
    let raw = read_substituted(path)?;
    parse_config(&raw, path)
}

/// Load the config file as a generic JSON tree, after env substitution.
pub fn load_config_value(path: &Path) -> Result<serde_json::Value> {
    let raw = read_substituted(path)?;
    parse_config_value(&raw, path)
}

/// Discover and load config from standard locations, then apply
/// `SITEWATCH_*` environment overrides.
///
/// Search order:
/// 1. `./sitewatch.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/sitewatch/sitewatch.{toml,yaml,yml,json}`
///
/// A missing file yields defaults; a file that fails to parse is an error.
pub fn discover_and_load() -> Result<SitewatchConfig> {
    let config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            SitewatchConfig::default()
        },
    };
    Ok(apply_env_overrides(config))
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sitewatch").map(|d| d.config_dir().to_path_buf())
}

/// Override selected fields from `SITEWATCH_*` environment variables.
pub fn apply_env_overrides(config: SitewatchConfig) -> SitewatchConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    mut config: SitewatchConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> SitewatchConfig {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SITEWATCH_DATABASE_URL") {
        config.database.url = v;
    }
    if let Some(v) = get("SITEWATCH_CHROME_PATH") {
        config.render.chrome_path = Some(v);
    }
    if let Some(v) = get("SITEWATCH_TIMEZONE") {
        config.notifications.timezone = v;
    }
    if let Some(v) = get("SITEWATCH_INTER_SITE_DELAY_MS") {
        match v.parse() {
            Ok(ms) => config.monitor.inter_site_delay_ms = ms,
            Err(e) => warn!(value = %v, error = %e, "ignoring SITEWATCH_INTER_SITE_DELAY_MS"),
        }
    }

    let email = &mut config.notifications.email;
    if let Some(v) = get("SITEWATCH_GMAIL_SENDER") {
        email.sender = Some(v);
    }
    if let Some(v) = get("SITEWATCH_GMAIL_CLIENT_ID") {
        email.client_id = Some(v);
    }
    if let Some(v) = get("SITEWATCH_GMAIL_CLIENT_SECRET") {
        email.client_secret = Some(Secret::new(v));
    }
    if let Some(v) = get("SITEWATCH_GMAIL_REFRESH_TOKEN") {
        email.refresh_token = Some(Secret::new(v));
    }

    if let Some(v) = get("SITEWATCH_LINE_CHANNEL_ACCESS_TOKEN") {
        config.notifications.line.channel_access_token = Some(Secret::new(v));
    }

    config
}

fn read_substituted(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(substitute_env(&raw))
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> Result<SitewatchConfig> {
    match extension(path) {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse("toml", e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

pub(crate) fn parse_config_value(raw: &str, path: &Path) -> Result<serde_json::Value> {
    match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw).map_err(|e| Error::parse("toml", e))?;
            serde_json::to_value(v).map_err(|e| Error::parse("toml", e))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e))?;
            serde_json::to_value(v).map_err(|e| Error::parse("yaml", e))
        },
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, sitewatch_common::StrategyKind};

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("sitewatch.toml");
        std::fs::write(&toml_path, "[monitor]\ninter_site_delay_ms = 5\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().monitor.inter_site_delay_ms, 5);

        let yaml_path = dir.path().join("sitewatch.yaml");
        std::fs::write(&yaml_path, "fetch:\n  strategies: [rendered-browser]\n").unwrap();
        assert_eq!(load_config(&yaml_path).unwrap().fetch.strategies, vec![
            StrategyKind::RenderedBrowser
        ]);

        let json_path = dir.path().join("sitewatch.json");
        std::fs::write(&json_path, r#"{"database": {"url": "sqlite::memory:"}}"#).unwrap();
        assert_eq!(load_config(&json_path).unwrap().database.url, "sqlite::memory:");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sitewatch.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[test]
    fn parse_errors_carry_format() {
        let err = parse_config("[monitor\n", Path::new("a.toml")).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse toml config"));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/sitewatch.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_replace_fields() {
        let lookup = |name: &str| match name {
            "SITEWATCH_DATABASE_URL" => Some("sqlite::memory:".to_string()),
            "SITEWATCH_LINE_CHANNEL_ACCESS_TOKEN" => Some("line-token".to_string()),
            "SITEWATCH_GMAIL_REFRESH_TOKEN" => Some(String::new()),
            "SITEWATCH_INTER_SITE_DELAY_MS" => Some("not-a-number".to_string()),
            _ => None,
        };
        let cfg = apply_env_overrides_with(SitewatchConfig::default(), lookup);
        assert_eq!(cfg.database.url, "sqlite::memory:");
        assert_eq!(
            cfg.notifications
                .line
                .channel_access_token
                .as_ref()
                .unwrap()
                .expose_secret(),
            "line-token"
        );
        // Blank values do not override.
        assert!(cfg.notifications.email.refresh_token.is_none());
        assert_eq!(cfg.monitor.inter_site_delay_ms, 2_000);
    }
}
