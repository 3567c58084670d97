mod browser_commands;
mod config_commands;
mod monitor_commands;
mod sites_commands;

use std::path::{Path, PathBuf};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    sitewatch_config::SitewatchConfig,
    sitewatch_store::SqliteStore,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "sitewatch",
    version,
    about = "Sitewatch: website change monitor"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching `./` and the user config
    /// directory.
    #[arg(long, global = true, env = "SITEWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every active site once (default when no subcommand is provided).
    Run(monitor_commands::RunArgs),
    /// Fetch a URL and show what would be recorded. Nothing is persisted.
    Check {
        url: String,
        /// Comma-delimited keywords to look for.
        #[arg(long)]
        keywords: Option<String>,
    },
    /// Show recent check records for a site.
    History {
        site_id: i64,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Site management.
    Sites {
        #[command(subcommand)]
        action: sites_commands::SiteAction,
    },
    /// Subscriber management.
    Subscribers {
        #[command(subcommand)]
        action: sites_commands::SubscriberAction,
    },
    /// Show whether a browser for rendered fetches is available.
    Browser,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit file when given, otherwise discover one. Environment
/// overrides apply either way.
fn load_config(path: Option<&Path>) -> anyhow::Result<SitewatchConfig> {
    match path {
        Some(path) => {
            let config = sitewatch_config::load_config(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            Ok(sitewatch_config::apply_env_overrides(config))
        },
        None => sitewatch_config::discover_and_load().context("failed to load config"),
    }
}

async fn open_store(config: &SitewatchConfig) -> anyhow::Result<SqliteStore> {
    SqliteStore::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "sitewatch starting");

    let config_path = cli.config.as_deref();
    match cli.command {
        None => monitor_commands::run(config_path, monitor_commands::RunArgs::default()).await,
        Some(Commands::Run(args)) => monitor_commands::run(config_path, args).await,
        Some(Commands::Check { url, keywords }) => {
            monitor_commands::check(config_path, &url, keywords.as_deref()).await
        },
        Some(Commands::History { site_id, limit }) => {
            monitor_commands::history(config_path, site_id, limit).await
        },
        Some(Commands::Sites { action }) => sites_commands::handle_sites(config_path, action).await,
        Some(Commands::Subscribers { action }) => {
            sites_commands::handle_subscribers(config_path, action).await
        },
        Some(Commands::Browser) => browser_commands::status(config_path),
        Some(Commands::Config { action }) => config_commands::handle_config(config_path, action),
    }
}
