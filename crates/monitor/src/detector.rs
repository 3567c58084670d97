//! Change classification over a site's recent history.

use sitewatch_common::{
    ChangeAspect, ChangeEvent, ChangeKind, ChangeResult, ChangeSeverity, CheckRecord, Locale,
};

/// Classify the difference between the two most recent successful records.
///
/// `records` must be newest first. Failed records (no fingerprint) are
/// skipped, so a failed fetch between two identical pages is not a change.
pub fn detect_change(records: &[CheckRecord]) -> ChangeResult {
    let mut successful = records.iter().filter(|r| r.is_success());
    let (Some(current), Some(previous)) = (successful.next(), successful.next()) else {
        return ChangeResult::insufficient_data();
    };

    let kind = if current.fingerprint != previous.fingerprint {
        ChangeKind::Content
    } else if current.keyword_matched != previous.keyword_matched {
        if current.keyword_matched {
            ChangeKind::KeywordAppeared
        } else {
            ChangeKind::KeywordDisappeared
        }
    } else {
        ChangeKind::NoChange
    };

    ChangeResult {
        has_changed: kind.is_change(),
        kind,
        current_fingerprint: current.fingerprint.clone(),
        previous_fingerprint: previous.fingerprint.clone(),
        current_keyword: current.keyword_matched,
        previous_keyword: previous.keyword_matched,
    }
}

// ── Change history ──────────────────────────────────────────────────────────

/// How urgent a move from `previous` to `current` HTTP status is.
pub fn status_severity(previous: u16, current: u16) -> ChangeSeverity {
    match (previous >= 400, current >= 400) {
        (false, true) => ChangeSeverity::Critical,
        (true, false) => ChangeSeverity::High,
        (true, true) => ChangeSeverity::Medium,
        (false, false) => ChangeSeverity::Low,
    }
}

/// Every aspect in which `latest` differs from earlier checks.
///
/// Availability and status compare against `preceding`, the record just
/// before `latest` whether or not it succeeded. Content and keywords compare
/// against `previous_success`, and only when `latest` itself succeeded.
pub fn describe_changes(
    latest: &CheckRecord,
    preceding: Option<&CheckRecord>,
    previous_success: Option<&CheckRecord>,
) -> Vec<ChangeEvent> {
    let event = |previous: &CheckRecord,
                 aspect: ChangeAspect,
                 description: String,
                 severity: ChangeSeverity| ChangeEvent {
        site_id: latest.site_id,
        previous_check_id: previous.id,
        current_check_id: latest.id,
        aspect,
        description,
        old_value: None,
        new_value: None,
        severity,
        detected_at_ms: latest.created_at_ms,
    };
    let mut events = Vec::new();

    if let Some(preceding) = preceding {
        match (preceding.is_success(), latest.is_success()) {
            (true, false) => events.push(event(
                preceding,
                ChangeAspect::Availability,
                "Site encountered an error".into(),
                ChangeSeverity::Critical,
            )),
            (false, true) => events.push(event(
                preceding,
                ChangeAspect::Availability,
                "Site recovered from error".into(),
                ChangeSeverity::High,
            )),
            _ => {},
        }

        let (old, new) = (preceding.status_code, latest.status_code);
        if old != 0 && new != 0 && old != new {
            events.push(ChangeEvent {
                old_value: Some(old.to_string()),
                new_value: Some(new.to_string()),
                ..event(
                    preceding,
                    ChangeAspect::Status,
                    format!("HTTP status changed from {old} to {new}"),
                    status_severity(old, new),
                )
            });
        }
    }

    if latest.is_success()
        && let Some(previous) = previous_success.filter(|p| p.is_success())
    {
        if previous.fingerprint != latest.fingerprint {
            events.push(ChangeEvent {
                old_value: previous.fingerprint.as_ref().map(|f| f.as_str().to_string()),
                new_value: latest.fingerprint.as_ref().map(|f| f.as_str().to_string()),
                ..event(
                    previous,
                    ChangeAspect::Content,
                    ChangeKind::Content.label(Locale::En).into(),
                    ChangeSeverity::High,
                )
            });
        }
        if previous.keyword_matched != latest.keyword_matched {
            let kind = if latest.keyword_matched {
                ChangeKind::KeywordAppeared
            } else {
                ChangeKind::KeywordDisappeared
            };
            events.push(ChangeEvent {
                old_value: Some(previous.keyword_matched.to_string()),
                new_value: Some(latest.keyword_matched.to_string()),
                ..event(
                    previous,
                    ChangeAspect::Keywords,
                    kind.label(Locale::En).into(),
                    ChangeSeverity::Medium,
                )
            });
        }
    }

    events
}

/// The most urgent severity among `events`.
pub fn overall_severity(events: &[ChangeEvent]) -> Option<ChangeSeverity> {
    events.iter().map(|e| e.severity).max()
}
