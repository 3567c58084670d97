//! `run`, `check` and `history`.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    clap::Args,
    sitewatch_channels::{
        ChannelRegistry, GmailChannel, LineChannel, LogChannel, MessageBuilder,
        NotificationDispatcher,
    },
    chrono_tz::Tz,
    sitewatch_common::{ChangeAspect, ChangeEvent, StrategyKind, time::format_ms},
    sitewatch_config::SitewatchConfig,
    sitewatch_fetch::FetchEngine,
    sitewatch_monitor::{BatchSummary, MonitorRunner, RunnerConfig, detect_change, inspect},
    sitewatch_store::PersistenceGateway,
    tracing::{info, warn},
};

use crate::config_commands;

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Only check sites whose check interval has elapsed.
    #[arg(long)]
    pub due_only: bool,
    /// Log notifications instead of sending them. Checks are still recorded.
    #[arg(long)]
    pub dry_run: bool,
    /// Print the batch summary as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    let validation = sitewatch_config::validate::validate(config_path);
    if validation.has_errors() {
        config_commands::print_diagnostics(&validation, false);
        bail!("configuration has errors; fix them or run `sitewatch config validate`");
    }

    let config = crate::load_config(config_path)?;
    if config
        .effective_strategies()
        .contains(&StrategyKind::RenderedBrowser)
    {
        sitewatch_browser::detect::check_and_warn(config.render.chrome_path.as_deref());
    }

    let registry = build_registry(&config, args.dry_run)?;
    info!(channels = ?registry.list(), dry_run = args.dry_run, "notification channels ready");
    let dispatcher = NotificationDispatcher::new(registry, MessageBuilder::from_config(&config));

    let store = crate::open_store(&config).await?;
    let engine = FetchEngine::from_config(&config).context("failed to build fetch engine")?;

    let mut runner_config = RunnerConfig::from(&config);
    if args.due_only {
        runner_config.only_due = true;
    }

    let runner = MonitorRunner::new(Arc::new(store), engine, dispatcher, runner_config);
    let summary = runner
        .run_to_completion()
        .await
        .context("monitoring batch aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Channels for this run. A dry run only logs; a normal run with nothing
/// enabled also falls back to logging.
pub(crate) fn build_registry(config: &SitewatchConfig, dry_run: bool) -> Result<ChannelRegistry> {
    let mut registry = ChannelRegistry::new();
    if dry_run {
        registry.register(Box::new(LogChannel::new()));
        return Ok(registry);
    }

    let notifications = &config.notifications;
    if notifications.email.enabled {
        let channel =
            GmailChannel::new(&notifications.email).context("failed to set up email channel")?;
        registry.register(Box::new(channel));
    }
    if notifications.line.enabled {
        let channel =
            LineChannel::new(&notifications.line).context("failed to set up LINE channel")?;
        registry.register(Box::new(channel));
    }
    if registry.is_empty() {
        warn!("no notification channel enabled, changes will only be logged");
        registry.register(Box::new(LogChannel::new()));
    }
    Ok(registry)
}

fn print_summary(summary: &BatchSummary) {
    for o in &summary.outcomes {
        let status = match (o.success, o.has_changed) {
            (false, _) => "FAILED ",
            (true, true) => "CHANGED",
            (true, false) => "ok     ",
        };
        let mut detail = match (&o.error, o.change) {
            (Some(error), _) => error.clone(),
            (None, Some(change)) => change.to_string(),
            (None, None) => String::new(),
        };
        if let Some(severity) = o.severity {
            detail.push_str(&format!(" [{severity}]"));
        }
        println!("{status} #{:<4} {:<30} {detail}", o.site_id, o.site_name);
        if let Some(counts) = o.notified {
            println!(
                "        notified {} user(s): {} sent, {} failed",
                counts.total, counts.succeeded, counts.failed
            );
        }
    }
    println!(
        "\n{} checked, {} changed, {} failed, {} not due",
        summary.outcomes.len(),
        summary.changed(),
        summary.failed(),
        summary.skipped_not_due
    );
}

pub async fn check(config_path: Option<&Path>, url: &str, keywords: Option<&str>) -> Result<()> {
    let config = crate::load_config(config_path)?;
    let engine = FetchEngine::from_config(&config).context("failed to build fetch engine")?;
    let report = inspect(&engine, url, keywords, config.monitor.preview_chars).await;
    engine.shutdown().await;

    println!("url:          {}", report.url);
    for (strategy, error) in &report.failures {
        println!("  {strategy} failed: {error}");
    }
    if !report.success {
        bail!("all fetch strategies failed for {url}");
    }

    println!("strategy:     {}", report.strategy);
    println!("status:       {}", report.status_code);
    println!("latency:      {} ms", report.latency_ms);
    if let Some(fp) = &report.fingerprint {
        println!("fingerprint:  {}", fp.as_str());
    }
    println!("length:       {} chars", report.content_length);
    if report.keywords.total_keywords > 0 {
        let found: Vec<&str> = report
            .keywords
            .matched_keywords
            .iter()
            .map(String::as_str)
            .collect();
        println!(
            "keywords:     {}/{} matched [{}]",
            found.len(),
            report.keywords.total_keywords,
            found.join(", ")
        );
    }
    println!("preview:      {}", report.preview);
    Ok(())
}

pub async fn history(config_path: Option<&Path>, site_id: i64, limit: u32) -> Result<()> {
    let config = crate::load_config(config_path)?;
    let store = crate::open_store(&config).await?;
    let tz = config.timezone();
    let locale = config.notifications.locale;

    let site = store.get_site(site_id).await?;
    let records = store.load_recent_records(site_id, limit).await?;
    let latest_successes = store.load_successful_records(site_id, 2).await?;
    let changes = store.load_change_history(site_id, limit).await?;
    let notifications = store.load_notifications(site_id, limit).await?;
    store.close().await;

    println!("#{} {} <{}>", site.id, site.name, site.url);
    if let Some(keywords) = &site.keywords {
        println!("keywords: {keywords}");
    }
    println!();

    if records.is_empty() {
        println!("no checks recorded yet");
        return Ok(());
    }
    for r in &records {
        let strategy = r.strategy.map(StrategyKind::as_str).unwrap_or("-");
        match &r.fingerprint {
            Some(fp) => println!(
                "{}  {:<16} {:>3}  {}  {:>7} chars  {:>5} ms{}",
                format_ms(r.created_at_ms, &tz),
                strategy,
                r.status_code,
                fp.short(),
                r.content_length,
                r.latency_ms,
                if r.keyword_matched { "  keyword" } else { "" }
            ),
            None => println!(
                "{}  {:<16} {:>3}  fetch failed",
                format_ms(r.created_at_ms, &tz),
                strategy,
                r.status_code
            ),
        }
    }

    let change = detect_change(&latest_successes);
    println!("\nlatest comparison: {}", change.kind.label(locale));

    if !changes.is_empty() {
        println!("\nchanges:");
        for event in &changes {
            println!("{}", format_change(event, &tz));
        }
    }

    if !notifications.is_empty() {
        println!("\nnotifications:");
        for n in &notifications {
            println!(
                "{}  user #{:<4} {:<5} {}{}",
                format_ms(n.created_at_ms, &tz),
                n.subscriber_id,
                n.channel.as_str(),
                n.status.as_str(),
                n.error
                    .as_deref()
                    .map(|e| format!(" ({e})"))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn format_change(event: &ChangeEvent, tz: &Tz) -> String {
    let values = match (&event.old_value, &event.new_value) {
        (Some(old), Some(new)) if event.aspect == ChangeAspect::Content => {
            format!(" ({} -> {})", short(old), short(new))
        },
        (Some(old), Some(new)) => format!(" ({old} -> {new})"),
        _ => String::new(),
    };
    format!(
        "{}  {:<8} {:<12} {}{values}",
        format_ms(event.detected_at_ms, tz),
        event.severity.as_str(),
        event.aspect.as_str(),
        event.description
    )
}

/// Leading characters of a fingerprint, enough to tell two apart.
fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        sitewatch_common::{ChangeSeverity, ChannelKind},
    };

    fn event(aspect: ChangeAspect, old: &str, new: &str) -> ChangeEvent {
        ChangeEvent {
            site_id: 1,
            previous_check_id: Some(1),
            current_check_id: Some(2),
            aspect,
            description: "described".into(),
            old_value: Some(old.into()),
            new_value: Some(new.into()),
            severity: ChangeSeverity::Critical,
            detected_at_ms: 0,
        }
    }

    #[test]
    fn change_lines_show_severity_and_values() {
        let line = format_change(&event(ChangeAspect::Status, "200", "503"), &chrono_tz::UTC);
        assert_eq!(
            line,
            "1970-01-01 00:00:00  critical status       described (200 -> 503)"
        );
    }

    #[test]
    fn content_change_fingerprints_are_shortened() {
        let line = format_change(
            &event(ChangeAspect::Content, &"a".repeat(64), &"b".repeat(64)),
            &chrono_tz::UTC,
        );
        assert!(line.ends_with(&format!("({} -> {})", "a".repeat(12), "b".repeat(12))));
    }

    #[test]
    fn dry_run_only_logs() {
        let mut config = SitewatchConfig::default();
        config.notifications.line.enabled = true;
        let registry = build_registry(&config, true).unwrap();
        assert_eq!(registry.list(), vec![ChannelKind::Log]);
    }

    #[test]
    fn nothing_enabled_falls_back_to_log() {
        let registry = build_registry(&SitewatchConfig::default(), false).unwrap();
        assert_eq!(registry.list(), vec![ChannelKind::Log]);
    }

    #[test]
    fn enabled_channel_without_credentials_is_an_error() {
        let mut config = SitewatchConfig::default();
        config.notifications.line.enabled = true;
        assert!(build_registry(&config, false).is_err());
    }

    #[test]
    fn configured_line_channel_is_registered() {
        let mut config = SitewatchConfig::default();
        config.notifications.line.enabled = true;
        config.notifications.line.channel_access_token =
            Some(secrecy::Secret::new("token".to_string()));
        let registry = build_registry(&config, false).unwrap();
        assert_eq!(registry.list(), vec![ChannelKind::Line]);
    }
}
