//! Configuration loading, validation and env substitution.
//!
//! Config files: `sitewatch.toml`, `sitewatch.yaml`, `sitewatch.yml` or
//! `sitewatch.json`, searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in the raw file and `SITEWATCH_*`
//! environment overrides after parsing.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        DatabaseConfig, EmailConfig, FetchConfig, LineConfig, MonitorConfig, NotificationsConfig,
        RenderConfig, SitewatchConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
