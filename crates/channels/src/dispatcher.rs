//! Fan-out of one detected change to every subscriber.

use {
    sitewatch_common::{
        ChangeResult, NotificationRecord, NotificationStatus, Site, SiteId, Subscriber,
        SubscriberId,
    },
    tracing::{debug, info, warn},
};

use crate::{
    message::{MessageBuilder, NotificationMessage},
    registry::ChannelRegistry,
};

/// Delivery outcome for one subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDispatch {
    pub subscriber_id: SubscriberId,
    /// True when at least one channel delivered.
    pub success: bool,
    /// One record per attempted channel.
    pub attempts: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub site_id: SiteId,
    pub total_users: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub per_user: Vec<UserDispatch>,
}

impl DispatchReport {
    /// Every channel attempt, in delivery order.
    pub fn records(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.per_user.iter().flat_map(|u| u.attempts.iter())
    }
}

pub struct NotificationDispatcher {
    registry: ChannelRegistry,
    messages: MessageBuilder,
}

impl NotificationDispatcher {
    pub fn new(registry: ChannelRegistry, messages: MessageBuilder) -> Self {
        Self { registry, messages }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn message(&self, site: &Site, change: &ChangeResult, at_ms: u64) -> NotificationMessage {
        self.messages.build(site, change, at_ms)
    }

    /// Notify every subscriber over each of their enabled channels.
    ///
    /// Channel failures are logged and recorded, never returned. A subscriber
    /// counts as a success when any channel delivered; subscribers with no
    /// attempted channel count as failures.
    pub async fn dispatch(
        &self,
        site: &Site,
        change: &ChangeResult,
        subscribers: &[Subscriber],
        at_ms: u64,
    ) -> DispatchReport {
        let message = self.messages.build(site, change, at_ms);
        let mut per_user = Vec::with_capacity(subscribers.len());

        for subscriber in subscribers {
            let mut outcome = UserDispatch {
                subscriber_id: subscriber.id,
                success: false,
                attempts: Vec::new(),
            };

            for channel in self.registry.iter() {
                let channel_kind = channel.kind();
                let Some(destination) = subscriber.destination(channel_kind) else {
                    continue;
                };
                let (status, error) = match channel.send(destination, &message).await {
                    Ok(()) => {
                        debug!(site_id = site.id, subscriber_id = subscriber.id, channel = %channel_kind, "notified");
                        outcome.success = true;
                        (NotificationStatus::Sent, None)
                    },
                    Err(e) => {
                        warn!(
                            site_id = site.id,
                            site = %site.name,
                            subscriber_id = subscriber.id,
                            channel = %channel_kind,
                            stage = "notify",
                            transient = e.is_transient(),
                            error = %e,
                            "notification channel failed"
                        );
                        (NotificationStatus::Failed, Some(e.to_string()))
                    },
                };
                outcome.attempts.push(NotificationRecord {
                    subscriber_id: subscriber.id,
                    site_id: site.id,
                    channel: channel_kind,
                    message: message.text.clone(),
                    status,
                    error,
                    created_at_ms: at_ms,
                });
            }

            if outcome.attempts.is_empty() {
                debug!(site_id = site.id, subscriber_id = subscriber.id, "no deliverable channel");
            }
            per_user.push(outcome);
        }

        let success_count = per_user.iter().filter(|u| u.success).count();
        let report = DispatchReport {
            site_id: site.id,
            total_users: subscribers.len(),
            success_count,
            failure_count: subscribers.len() - success_count,
            per_user,
        };
        info!(
            site_id = site.id,
            site = %site.name,
            total = report.total_users,
            succeeded = report.success_count,
            failed = report.failure_count,
            "notification summary"
        );
        report
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{Error, Result, channel::NotificationChannel},
        async_trait::async_trait,
        rstest::rstest,
        sitewatch_common::{ChangeKind, ChannelKind, Locale},
        std::sync::{Arc, Mutex},
    };

    /// Records destinations; fails for any destination in `fail_for`.
    struct Recording {
        kind: ChannelKind,
        fail_for: Vec<&'static str>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl NotificationChannel for Recording {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn send(&self, destination: &str, _message: &NotificationMessage) -> Result<()> {
            if self.fail_for.iter().any(|f| *f == destination) {
                return Err(Error::rejected("test", 500, "boom"));
            }
            self.sent.lock().unwrap().push(destination.to_string());
            Ok(())
        }
    }

    struct Fixture {
        dispatcher: NotificationDispatcher,
        emails: Arc<Mutex<Vec<String>>>,
        lines: Arc<Mutex<Vec<String>>>,
    }

    fn fixture(email_fail: Vec<&'static str>, line_fail: Vec<&'static str>) -> Fixture {
        let emails = Arc::new(Mutex::new(Vec::new()));
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ChannelRegistry::new();
        registry.register(Box::new(Recording {
            kind: ChannelKind::Email,
            fail_for: email_fail,
            sent: emails.clone(),
        }));
        registry.register(Box::new(Recording {
            kind: ChannelKind::Line,
            fail_for: line_fail,
            sent: lines.clone(),
        }));
        Fixture {
            dispatcher: NotificationDispatcher::new(
                registry,
                MessageBuilder::new(Locale::En, chrono_tz::UTC, "Update"),
            ),
            emails,
            lines,
        }
    }

    fn site() -> Site {
        Site::new(5, "shop", "https://example.com").unwrap()
    }

    fn change(kind: ChangeKind) -> ChangeResult {
        ChangeResult {
            has_changed: kind.is_change(),
            kind,
            ..ChangeResult::insufficient_data()
        }
    }

    #[tokio::test]
    async fn email_failure_falls_back_to_line() {
        let f = fixture(vec!["a@x.com"], vec![]);
        let subs = vec![Subscriber::new(1).with_email("a@x.com").with_line("U1")];
        let report = f
            .dispatcher
            .dispatch(&site(), &change(ChangeKind::Content), &subs, 10)
            .await;
        assert_eq!(report.success_count, 1);
        assert_eq!(report.per_user[0].attempts.len(), 2);
        assert_eq!(report.per_user[0].attempts[0].status, NotificationStatus::Failed);
        assert!(report.per_user[0].attempts[0].error.as_deref().unwrap().contains("boom"));
        assert_eq!(report.per_user[0].attempts[1].status, NotificationStatus::Sent);
        assert_eq!(*f.lines.lock().unwrap(), vec!["U1"]);
    }

    #[tokio::test]
    async fn disabled_or_missing_destinations_are_skipped() {
        let f = fixture(vec![], vec![]);
        let mut no_email = Subscriber::new(1).with_email("off@x.com");
        no_email.email_enabled = false;
        let mut line_off = Subscriber::new(2).with_line("U2");
        line_off.line_enabled = false;
        line_off.email = Some("  ".into());
        let report = f
            .dispatcher
            .dispatch(&site(), &change(ChangeKind::Content), &[no_email, line_off], 10)
            .await;
        assert_eq!(report.success_count, 0);
        assert_eq!(report.failure_count, 2);
        assert_eq!(report.records().count(), 0);
        assert!(f.emails.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_channel_is_not_attempted() {
        let mut registry = ChannelRegistry::new();
        let sent = Arc::new(Mutex::new(Vec::new()));
        registry.register(Box::new(Recording {
            kind: ChannelKind::Email,
            fail_for: vec![],
            sent: sent.clone(),
        }));
        let dispatcher = NotificationDispatcher::new(
            registry,
            MessageBuilder::new(Locale::En, chrono_tz::UTC, "Update"),
        );
        let mut only_line = Subscriber::new(1).with_line("U1");
        only_line.email_enabled = false;
        let report = dispatcher
            .dispatch(&site(), &change(ChangeKind::Content), &[only_line], 0)
            .await;
        assert_eq!(report.failure_count, 1);
        assert!(report.per_user[0].attempts.is_empty());
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(3, vec![])]
    #[case(4, vec!["u1@x.com", "u3@x.com"])]
    #[case(5, vec!["u0@x.com", "u1@x.com", "u2@x.com", "u3@x.com", "u4@x.com"])]
    #[tokio::test]
    async fn counts_always_add_up(#[case] n: usize, #[case] failing: Vec<&'static str>) {
        let f = fixture(failing.clone(), vec![]);
        let subs: Vec<Subscriber> = (0..n)
            .map(|i| Subscriber::new(i as i64).with_email(format!("u{i}@x.com")))
            .collect();
        let report = f
            .dispatcher
            .dispatch(&site(), &change(ChangeKind::KeywordAppeared), &subs, 0)
            .await;
        assert_eq!(report.total_users, n);
        assert_eq!(report.success_count + report.failure_count, n);
        assert_eq!(report.failure_count, failing.len());
        assert_eq!(report.records().count(), n);
    }

    #[tokio::test]
    async fn records_carry_message_text() {
        let f = fixture(vec![], vec![]);
        let subs = vec![Subscriber::new(9).with_email("z@x.com")];
        let report = f
            .dispatcher
            .dispatch(&site(), &change(ChangeKind::Content), &subs, 42)
            .await;
        let record = report.records().next().unwrap();
        assert_eq!(record.site_id, 5);
        assert_eq!(record.channel, ChannelKind::Email);
        assert_eq!(record.created_at_ms, 42);
        assert!(record.message.contains("Content has changed"));
    }
}
