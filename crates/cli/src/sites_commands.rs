//! Registration of sites and subscribers.

use std::path::Path;

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    sitewatch_common::time::format_ms,
    sitewatch_store::{NewSite, NewSubscriber, PersistenceGateway},
};

#[derive(Subcommand)]
pub enum SiteAction {
    /// List every registered site.
    List,
    /// Register a site to monitor.
    Add {
        name: String,
        url: String,
        /// Comma-delimited keywords to watch for.
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long, default_value_t = sitewatch_common::types::DEFAULT_CHECK_INTERVAL_HOURS)]
        interval_hours: u32,
    },
    /// Stop monitoring a site without deleting its history.
    Disable { site_id: i64 },
    /// Resume monitoring a disabled site.
    Enable { site_id: i64 },
}

#[derive(Subcommand)]
pub enum SubscriberAction {
    /// Register a subscriber and subscribe them to sites.
    Add {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        line_user_id: Option<String>,
        /// Register the email address without sending to it.
        #[arg(long)]
        no_email: bool,
        /// Site ids to subscribe to.
        #[arg(long = "site", value_delimiter = ',')]
        sites: Vec<i64>,
    },
}

pub async fn handle_sites(config_path: Option<&Path>, action: SiteAction) -> Result<()> {
    let config = crate::load_config(config_path)?;
    let store = crate::open_store(&config).await?;
    let result = match action {
        SiteAction::List => {
            let tz = config.timezone();
            let sites = store.list_sites().await?;
            if sites.is_empty() {
                println!("no sites registered");
            }
            for site in sites {
                let last = site
                    .last_checked_ms
                    .map(|ms| format_ms(ms, &tz))
                    .unwrap_or_else(|| "never".into());
                println!(
                    "#{:<4} {:<8} every {:>3}h  last {:<19}  {} <{}>",
                    site.id,
                    if site.active { "active" } else { "disabled" },
                    site.check_interval_hours,
                    last,
                    site.name,
                    site.url
                );
                if let Some(keywords) = &site.keywords {
                    println!("      keywords: {keywords}");
                }
            }
            Ok(())
        },
        SiteAction::Add {
            name,
            url,
            keywords,
            interval_hours,
        } => {
            if interval_hours == 0 {
                bail!("--interval-hours must be at least 1");
            }
            let new_site = NewSite::new(name, url)?
                .with_keywords(keywords)
                .with_interval_hours(interval_hours);
            let site = store.add_site(&new_site).await?;
            println!("added site #{} {} <{}>", site.id, site.name, site.url);
            Ok(())
        },
        SiteAction::Disable { site_id } => {
            store.set_site_active(site_id, false).await?;
            println!("site #{site_id} disabled");
            Ok(())
        },
        SiteAction::Enable { site_id } => {
            store.set_site_active(site_id, true).await?;
            println!("site #{site_id} enabled");
            Ok(())
        },
    };
    store.close().await;
    result
}

pub async fn handle_subscribers(config_path: Option<&Path>, action: SubscriberAction) -> Result<()> {
    match action {
        SubscriberAction::Add {
            email,
            line_user_id,
            no_email,
            sites,
        } => {
            let new = new_subscriber(email, line_user_id, no_email)?;
            let config = crate::load_config(config_path)?;
            let store = crate::open_store(&config).await?;
            let result = async {
                let subscriber = store.add_subscriber(&new).await?;
                for site_id in &sites {
                    store.subscribe(subscriber.id, *site_id).await?;
                }
                println!(
                    "added subscriber #{} (email: {}, line: {}), {} site(s)",
                    subscriber.id,
                    subscriber.email.as_deref().unwrap_or("-"),
                    subscriber.line_user_id.as_deref().unwrap_or("-"),
                    sites.len()
                );
                anyhow::Ok(())
            }
            .await;
            store.close().await;
            result
        },
    }
}

/// A LINE id turns the LINE channel on; `--no-email` turns email off.
fn new_subscriber(
    email: Option<String>,
    line_user_id: Option<String>,
    no_email: bool,
) -> Result<NewSubscriber> {
    if email.is_none() && line_user_id.is_none() {
        bail!("a subscriber needs --email or --line-user-id");
    }
    let line_enabled = line_user_id.is_some();
    Ok(NewSubscriber {
        email,
        line_user_id,
        email_enabled: no_email.then_some(false),
        line_enabled: Some(line_enabled),
    })
}
