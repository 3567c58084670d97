//! Per-site outcomes and batch totals.

use {
    serde::Serialize,
    sitewatch_common::{ChangeKind, ChangeSeverity, Locale, SiteId, StrategyKind},
    tracing::{info, warn},
};

/// Notification totals for a site whose change was dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotifyCounts {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// What happened to one site during a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteOutcome {
    pub site_id: SiteId,
    pub site_name: String,
    /// The page was fetched and its check record persisted.
    pub success: bool,
    pub has_changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeKind>,
    /// Most urgent entry this check added to the change history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<ChangeSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyKind>,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Leading part of the canonical text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notified: Option<NotifyCounts>,
}

impl SiteOutcome {
    pub fn failure(site_id: SiteId, site_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            site_id,
            site_name: site_name.into(),
            success: false,
            has_changed: false,
            change: None,
            severity: None,
            strategy: None,
            status_code: 0,
            error: Some(error.into()),
            preview: None,
            notified: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub outcomes: Vec<SiteOutcome>,
    /// Active sites left out because they were not yet due.
    pub skipped_not_due: usize,
}

impl BatchSummary {
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }

    pub fn changed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.success && o.has_changed)
            .count()
    }

    /// Emit the end-of-batch report.
    pub fn log(&self, locale: Locale) {
        info!(
            successful = self.successful(),
            failed = self.failed(),
            changed = self.changed(),
            skipped_not_due = self.skipped_not_due,
            "batch complete"
        );
        for o in self.outcomes.iter().filter(|o| o.success && o.has_changed) {
            let reason = o.change.map(|c| c.label(locale)).unwrap_or_default();
            let severity = o.severity.map_or("unknown", ChangeSeverity::as_str);
            info!(site_id = o.site_id, site = %o.site_name, reason, severity, "site changed");
        }
        for o in self.outcomes.iter().filter(|o| !o.success) {
            warn!(
                site_id = o.site_id,
                site = %o.site_name,
                error = o.error.as_deref().unwrap_or("unknown"),
                "site failed"
            );
        }
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn ok(id: SiteId, changed: bool) -> SiteOutcome {
        SiteOutcome {
            success: true,
            has_changed: changed,
            change: Some(if changed {
                ChangeKind::Content
            } else {
                ChangeKind::NoChange
            }),
            error: None,
            ..SiteOutcome::failure(id, format!("s{id}"), "")
        }
    }

    #[test]
    fn totals() {
        let summary = BatchSummary {
            outcomes: vec![
                ok(1, true),
                ok(2, false),
                SiteOutcome::failure(3, "s3", "timeout"),
            ],
            skipped_not_due: 0,
        };
        assert_eq!(summary.successful(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.changed(), 1);
    }

    #[test]
    fn preview_cuts_on_chars() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("あいうえお", 2), "あい...");
        assert_eq!(preview(&"x".repeat(201), 200), format!("{}...", "x".repeat(200)));
    }

    #[test]
    fn outcome_serializes_without_empty_fields() {
        let json = serde_json::to_value(SiteOutcome::failure(1, "a", "boom")).unwrap();
        assert_eq!(json["error"], "boom");
        assert!(json.get("preview").is_none());
        assert!(json.get("change").is_none());
        assert!(json.get("severity").is_none());

        let changed = SiteOutcome {
            severity: Some(ChangeSeverity::High),
            ..ok(2, true)
        };
        let json = serde_json::to_value(changed).unwrap();
        assert_eq!(json["severity"], "high");
    }
}
