//! The per-site pipeline and the sequential batch over all active sites.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use {
    futures::FutureExt,
    sitewatch_channels::NotificationDispatcher,
    sitewatch_common::{ChangeResult, ChangeSeverity, CheckRecord, Locale, Site, now_ms},
    sitewatch_config::SitewatchConfig,
    sitewatch_content::{ContentNormalizer, fingerprint, match_keywords},
    sitewatch_fetch::FetchEngine,
    sitewatch_store::PersistenceGateway,
    tracing::{debug, error, info, warn},
};

use crate::{
    detector::{describe_changes, detect_change, overall_severity},
    error::{Error, Result, Stage},
    summary::{BatchSummary, NotifyCounts, SiteOutcome, preview},
};

/// Batch knobs, usually taken from the `[monitor]` config section.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pause between sites; not applied after the last one.
    pub inter_site_delay: Duration,
    /// Successful records loaded for change detection.
    pub history_window: u32,
    pub preview_chars: usize,
    /// Skip sites whose check interval has not elapsed.
    pub only_due: bool,
    /// Locale for change reasons in the batch report.
    pub locale: Locale,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            inter_site_delay: Duration::from_secs(2),
            history_window: 10,
            preview_chars: 200,
            only_due: false,
            locale: Locale::Ja,
        }
    }
}

impl From<&SitewatchConfig> for RunnerConfig {
    fn from(config: &SitewatchConfig) -> Self {
        Self {
            inter_site_delay: Duration::from_millis(config.monitor.inter_site_delay_ms),
            history_window: config.monitor.history_window.max(2),
            preview_chars: config.monitor.preview_chars,
            only_due: config.monitor.only_due,
            locale: config.notifications.locale,
        }
    }
}

/// Drives fetch, normalization, persistence, detection and notification for
/// every active site, one site at a time.
pub struct MonitorRunner {
    gateway: Arc<dyn PersistenceGateway>,
    engine: FetchEngine,
    normalizer: ContentNormalizer,
    dispatcher: NotificationDispatcher,
    config: RunnerConfig,
}

impl MonitorRunner {
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        engine: FetchEngine,
        dispatcher: NotificationDispatcher,
        config: RunnerConfig,
    ) -> Self {
        Self {
            gateway,
            engine,
            normalizer: ContentNormalizer::new(),
            dispatcher,
            config,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Process every active site in order.
    ///
    /// Only failing to load the site list is an error; anything that goes
    /// wrong for one site is reported in that site's [`SiteOutcome`].
    pub async fn run_batch(&self) -> Result<BatchSummary> {
        let sites = self
            .gateway
            .load_active_sites()
            .await
            .map_err(Error::LoadSites)?;

        let now = now_ms();
        let total = sites.len();
        let sites: Vec<Site> = if self.config.only_due {
            sites.into_iter().filter(|s| s.is_due(now)).collect()
        } else {
            sites
        };
        let mut summary = BatchSummary {
            outcomes: Vec::with_capacity(sites.len()),
            skipped_not_due: total - sites.len(),
        };
        info!(
            sites = sites.len(),
            skipped_not_due = summary.skipped_not_due,
            "starting batch"
        );

        for (idx, site) in sites.iter().enumerate() {
            if idx > 0 && !self.config.inter_site_delay.is_zero() {
                tokio::time::sleep(self.config.inter_site_delay).await;
            }
            summary.outcomes.push(self.process_site(site).await);
        }

        summary.log(self.config.locale);
        Ok(summary)
    }

    /// Run one site's pipeline. Never fails: errors and panics become a
    /// failure outcome.
    pub async fn process_site(&self, site: &Site) -> SiteOutcome {
        info!(site_id = site.id, site = %site.name, url = %site.url, "processing site");
        match AssertUnwindSafe(self.pipeline(site)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(
                    site_id = site.id,
                    site = %site.name,
                    stage = e.stage().map_or("unknown", Stage::as_str),
                    error = %e,
                    "site pipeline failed"
                );
                SiteOutcome::failure(site.id, site.name.clone(), e.to_string())
            },
            Err(payload) => {
                let e = Error::panicked(payload.as_ref());
                error!(site_id = site.id, site = %site.name, error = %e, "site pipeline panicked");
                SiteOutcome::failure(site.id, site.name.clone(), e.to_string())
            },
        }
    }

    async fn pipeline(&self, site: &Site) -> Result<SiteOutcome> {
        let scrape = self.engine.fetch(&site.url).await;
        let checked_at = now_ms();

        if !scrape.success {
            let message = scrape
                .error
                .as_ref()
                .map_or_else(|| "fetch failed".to_string(), ToString::to_string);
            warn!(
                site_id = site.id,
                site = %site.name,
                strategy = %scrape.strategy,
                stage = Stage::Fetch.as_str(),
                attempts = scrape.attempts.len() + 1,
                error = %message,
                "all fetch strategies failed"
            );
            let mut record = CheckRecord::failed(
                site.id,
                scrape.status_code,
                Some(scrape.strategy),
                checked_at,
            );
            record.id = Some(self.persist(site, &record, checked_at).await?);
            let mut outcome = SiteOutcome::failure(site.id, site.name.clone(), message);
            outcome.strategy = Some(scrape.strategy);
            outcome.severity = self.record_history(site, &record, None).await;
            return Ok(outcome);
        }

        let text = self.normalizer.normalize(&scrape.body, scrape.strategy);
        let keywords = match_keywords(&text, site.keywords.as_deref());
        let content_length = text.chars().count() as u64;
        debug!(
            site_id = site.id,
            strategy = %scrape.strategy,
            status = scrape.status_code,
            content_length,
            keywords_matched = keywords.matched_keywords.len(),
            keywords_total = keywords.total_keywords,
            "page normalized"
        );

        let mut record = CheckRecord::succeeded(
            site.id,
            fingerprint(&text),
            content_length,
            scrape.status_code,
            scrape.latency_ms(),
            keywords.matched,
            scrape.strategy,
            checked_at,
        );
        record.id = Some(self.persist(site, &record, checked_at).await?);

        // Only successes count, so a long outage cannot push the last good
        // page out of the window.
        let history = self
            .gateway
            .load_successful_records(site.id, self.config.history_window)
            .await
            .map_err(|e| Error::persistence(Stage::LoadHistory, e))?;
        let change = detect_change(&history);
        let previous_success = history.iter().find(|r| r.id != record.id);
        let severity = self.record_history(site, &record, previous_success).await;

        let mut outcome = SiteOutcome {
            site_id: site.id,
            site_name: site.name.clone(),
            success: true,
            has_changed: change.has_changed,
            change: Some(change.kind),
            severity,
            strategy: Some(scrape.strategy),
            status_code: scrape.status_code,
            error: None,
            preview: Some(preview(&text, self.config.preview_chars)),
            notified: None,
        };

        if change.has_changed {
            info!(site_id = site.id, site = %site.name, change = %change.kind, "change detected");
            outcome.notified = Some(self.notify(site, &change, checked_at).await?);
        } else {
            info!(site_id = site.id, site = %site.name, result = %change.kind, "no change");
        }
        Ok(outcome)
    }

    async fn persist(&self, site: &Site, record: &CheckRecord, checked_at: u64) -> Result<i64> {
        let id = self
            .gateway
            .append_check_record(record)
            .await
            .map_err(|e| Error::persistence(Stage::AppendRecord, e))?;
        self.gateway
            .update_last_checked(site.id, checked_at)
            .await
            .map_err(|e| Error::persistence(Stage::UpdateLastChecked, e))?;
        debug!(site_id = site.id, record_id = id, success = record.is_success(), "check recorded");
        Ok(id)
    }

    /// Append what changed since the previous checks to the change history.
    /// Failures here are logged and never fail the site.
    async fn record_history(
        &self,
        site: &Site,
        latest: &CheckRecord,
        previous_success: Option<&CheckRecord>,
    ) -> Option<ChangeSeverity> {
        let preceding = match self.gateway.load_recent_records(site.id, 2).await {
            Ok(records) => records.into_iter().find(|r| r.id != latest.id),
            Err(e) => {
                warn!(
                    site_id = site.id,
                    stage = Stage::LoadHistory.as_str(),
                    error = %e,
                    "failed to load preceding check"
                );
                return None;
            },
        };

        let events = describe_changes(latest, preceding.as_ref(), previous_success);
        for event in &events {
            debug!(
                site_id = site.id,
                aspect = %event.aspect,
                severity = %event.severity,
                description = %event.description,
                "change recorded"
            );
            if let Err(e) = self.gateway.record_change(event).await {
                warn!(
                    site_id = site.id,
                    aspect = %event.aspect,
                    stage = Stage::RecordChange.as_str(),
                    error = %e,
                    "failed to record change"
                );
            }
        }
        overall_severity(&events)
    }

    async fn notify(&self, site: &Site, change: &ChangeResult, at_ms: u64) -> Result<NotifyCounts> {
        let subscribers = self
            .gateway
            .load_subscribers(site.id)
            .await
            .map_err(|e| Error::persistence(Stage::LoadSubscribers, e))?;
        if subscribers.is_empty() {
            info!(site_id = site.id, site = %site.name, "no subscribers to notify");
            return Ok(NotifyCounts::default());
        }

        let report = self
            .dispatcher
            .dispatch(site, change, &subscribers, at_ms)
            .await;
        for record in report.records() {
            if let Err(e) = self.gateway.record_notification(record).await {
                warn!(
                    site_id = site.id,
                    subscriber_id = record.subscriber_id,
                    stage = Stage::RecordNotification.as_str(),
                    error = %e,
                    "failed to record notification"
                );
            }
        }
        Ok(NotifyCounts {
            total: report.total_users,
            succeeded: report.success_count,
            failed: report.failure_count,
        })
    }

    /// Release the browser session and the store. Call once, on every exit
    /// path.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
        self.gateway.close().await;
        info!("monitor shut down");
    }

    /// [`Self::run_batch`] followed by [`Self::shutdown`], which runs even if
    /// the batch errors or panics.
    pub async fn run_to_completion(&self) -> Result<BatchSummary> {
        let result = AssertUnwindSafe(self.run_batch()).catch_unwind().await;
        self.shutdown().await;
        match result {
            Ok(result) => result,
            Err(payload) => Err(Error::panicked(payload.as_ref())),
        }
    }
}
