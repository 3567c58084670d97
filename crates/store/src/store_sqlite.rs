//! SQLite-backed store using sqlx.

use {
    async_trait::async_trait,
    sitewatch_common::{
        ChangeAspect, ChangeEvent, ChangeSeverity, CheckRecord, Fingerprint, NotificationRecord,
        NotificationStatus, Site, SiteId, StrategyKind, Subscriber, SubscriberId, now_ms,
    },
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions, sqlite::SqliteRow},
    tracing::{debug, warn},
};

use crate::{
    error::{Context, Error, Result},
    gateway::PersistenceGateway,
    types::{NewSite, NewSubscriber},
};

const SITE_COLUMNS: &str =
    "id, name, url, keywords, active, check_interval_hours, last_checked_ms";

const RECORD_COLUMNS: &str = "id, site_id, fingerprint, content_length, status_code, latency_ms, \
                              keyword_matched, strategy, created_at_ms";

const CHANGE_COLUMNS: &str = "site_id, previous_check_id, current_check_id, aspect, description, \
                              old_value, new_value, severity, detected_at_ms";

/// SQLite persistence for sites, subscribers and history.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect with a pool of 5 and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(database_url, 5).await
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await
            .map_err(|e| Error::external("failed to connect to SQLite", e))?;

        crate::run_migrations(&pool).await?;
        debug!(database_url, "sqlite store ready");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Call [`crate::run_migrations`] first.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ── Registration helpers ────────────────────────────────────────────────

    pub async fn add_site(&self, site: &NewSite) -> Result<Site> {
        let result = sqlx::query(
            "INSERT INTO sites (name, url, keywords, active, check_interval_hours, created_at_ms)
             VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(&site.name)
        .bind(&site.url)
        .bind(&site.keywords)
        .bind(i64::from(site.check_interval_hours))
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        self.get_site(result.last_insert_rowid()).await
    }

    pub async fn get_site(&self, site_id: SiteId) -> Result<Site> {
        let row = sqlx::query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = ?"))
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::site_not_found(site_id))?;
        site_from_row(&row)
    }

    /// Every site, active or not, by id.
    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        let rows = sqlx::query(&format!("SELECT {SITE_COLUMNS} FROM sites ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(site_from_row).collect()
    }

    pub async fn set_site_active(&self, site_id: SiteId, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE sites SET active = ? WHERE id = ?")
            .bind(active)
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::site_not_found(site_id));
        }
        Ok(())
    }

    pub async fn add_subscriber(&self, subscriber: &NewSubscriber) -> Result<Subscriber> {
        let result = sqlx::query(
            "INSERT INTO subscribers (email, line_user_id, email_enabled, line_enabled, active, created_at_ms)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(&subscriber.email)
        .bind(&subscriber.line_user_id)
        .bind(subscriber.email_enabled)
        .bind(subscriber.line_enabled)
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        Ok(Subscriber {
            id: result.last_insert_rowid(),
            email: subscriber.email.clone(),
            line_user_id: subscriber.line_user_id.clone(),
            email_enabled: subscriber.email_enabled(),
            line_enabled: subscriber.line_enabled(),
            active: true,
        })
    }

    /// Subscribe a user to a site. Subscribing twice is a no-op.
    pub async fn subscribe(&self, subscriber_id: SubscriberId, site_id: SiteId) -> Result<()> {
        self.get_site(site_id).await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM subscribers WHERE id = ?")
            .bind(subscriber_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::subscriber_not_found(subscriber_id));
        }
        sqlx::query(
            "INSERT INTO site_subscriptions (site_id, subscriber_id, created_at_ms) VALUES (?, ?, ?)
             ON CONFLICT(site_id, subscriber_id) DO NOTHING",
        )
        .bind(site_id)
        .bind(subscriber_id)
        .bind(now_ms() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent notification attempts for a site, newest first.
    pub async fn load_notifications(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>> {
        let rows = sqlx::query(
            "SELECT subscriber_id, site_id, channel, message, status, error, created_at_ms
             FROM notifications
             WHERE site_id = ?
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ?",
        )
        .bind(site_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let channel: String = row.get("channel");
            let status: String = row.get("status");
            records.push(NotificationRecord {
                subscriber_id: row.get("subscriber_id"),
                site_id: row.get("site_id"),
                channel: channel
                    .parse()
                    .with_context(|| format!("notification log for site {site_id}"))?,
                message: row.get("message"),
                status: match status.as_str() {
                    "sent" => NotificationStatus::Sent,
                    _ => NotificationStatus::Failed,
                },
                error: row.get("error"),
                created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
            });
        }
        Ok(records)
    }

    /// Most recent change history entries for a site, newest first.
    pub async fn load_change_history(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<ChangeEvent>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHANGE_COLUMNS} FROM change_history
             WHERE site_id = ?
             ORDER BY detected_at_ms DESC, id DESC
             LIMIT ?"
        ))
        .bind(site_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(change_from_row).collect()
    }
}

fn site_from_row(row: &SqliteRow) -> Result<Site> {
    let site = Site::new(
        row.get::<i64, _>("id"),
        row.get::<String, _>("name"),
        row.get::<String, _>("url"),
    )?;
    let keywords: Option<String> = row.get("keywords");
    let mut site = site
        .with_keywords(keywords.unwrap_or_default())
        .with_interval_hours(row.get::<i64, _>("check_interval_hours").max(0) as u32);
    site.active = row.get::<bool, _>("active");
    site.last_checked_ms = row
        .get::<Option<i64>, _>("last_checked_ms")
        .map(|v| v as u64);
    Ok(site)
}

fn record_from_row(row: &SqliteRow) -> Result<CheckRecord> {
    let fingerprint = row
        .get::<Option<String>, _>("fingerprint")
        .map(Fingerprint::from_hex)
        .transpose()?;
    let strategy = row
        .get::<Option<String>, _>("strategy")
        .and_then(|s| s.parse::<StrategyKind>().ok());
    Ok(CheckRecord {
        id: Some(row.get("id")),
        site_id: row.get("site_id"),
        fingerprint,
        content_length: row.get::<i64, _>("content_length") as u64,
        status_code: row.get::<i64, _>("status_code") as u16,
        latency_ms: row.get::<i64, _>("latency_ms") as u64,
        keyword_matched: row.get("keyword_matched"),
        strategy,
        created_at_ms: row.get::<i64, _>("created_at_ms") as u64,
    })
}

fn change_from_row(row: &SqliteRow) -> Result<ChangeEvent> {
    let aspect: String = row.get("aspect");
    let severity: String = row.get("severity");
    Ok(ChangeEvent {
        site_id: row.get("site_id"),
        previous_check_id: row.get("previous_check_id"),
        current_check_id: row.get("current_check_id"),
        aspect: aspect
            .parse::<ChangeAspect>()
            .context("change history row")?,
        description: row.get("description"),
        old_value: row.get("old_value"),
        new_value: row.get("new_value"),
        severity: severity
            .parse::<ChangeSeverity>()
            .context("change history row")?,
        detected_at_ms: row.get::<i64, _>("detected_at_ms") as u64,
    })
}

#[async_trait]
impl PersistenceGateway for SqliteStore {
    async fn load_active_sites(&self) -> Result<Vec<Site>> {
        let rows = sqlx::query(&format!(
            "SELECT {SITE_COLUMNS} FROM sites
             WHERE active = 1
             ORDER BY last_checked_ms IS NOT NULL, last_checked_ms ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut sites = Vec::with_capacity(rows.len());
        for row in &rows {
            match site_from_row(row) {
                Ok(site) => sites.push(site),
                Err(e) => {
                    let id: i64 = row.get("id");
                    warn!(site_id = id, error = %e, "skipping invalid site row");
                },
            }
        }
        Ok(sites)
    }

    async fn append_check_record(&self, record: &CheckRecord) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO check_records (site_id, fingerprint, content_length, status_code, latency_ms, keyword_matched, strategy, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.site_id)
        .bind(record.fingerprint.as_ref().map(Fingerprint::as_str))
        .bind(record.content_length as i64)
        .bind(i64::from(record.status_code))
        .bind(record.latency_ms as i64)
        .bind(record.keyword_matched)
        .bind(record.strategy.map(StrategyKind::as_str))
        .bind(record.created_at_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn load_recent_records(&self, site_id: SiteId, limit: u32) -> Result<Vec<CheckRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM check_records
             WHERE site_id = ?
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ?"
        ))
        .bind(site_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn load_successful_records(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<CheckRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM check_records
             WHERE site_id = ? AND fingerprint IS NOT NULL
             ORDER BY created_at_ms DESC, id DESC
             LIMIT ?"
        ))
        .bind(site_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    async fn load_subscribers(&self, site_id: SiteId) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query(
            "SELECT u.id, u.email, u.line_user_id,
                    COALESCE(u.email_enabled, 1) AS email_enabled,
                    COALESCE(u.line_enabled, 0) AS line_enabled,
                    u.active
             FROM subscribers u
             JOIN site_subscriptions s ON s.subscriber_id = u.id
             WHERE s.site_id = ? AND u.active = 1
             ORDER BY u.id",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Subscriber {
                id: row.get("id"),
                email: row.get("email"),
                line_user_id: row.get("line_user_id"),
                email_enabled: row.get("email_enabled"),
                line_enabled: row.get("line_enabled"),
                active: row.get("active"),
            })
            .collect())
    }

    async fn update_last_checked(&self, site_id: SiteId, at_ms: u64) -> Result<()> {
        let result = sqlx::query("UPDATE sites SET last_checked_ms = ? WHERE id = ?")
            .bind(at_ms as i64)
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::site_not_found(site_id));
        }
        Ok(())
    }

    async fn record_notification(&self, record: &NotificationRecord) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO notifications (subscriber_id, site_id, channel, message, status, error, created_at_ms)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.subscriber_id)
        .bind(record.site_id)
        .bind(record.channel.as_str())
        .bind(&record.message)
        .bind(record.status.as_str())
        .bind(&record.error)
        .bind(record.created_at_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn record_change(&self, event: &ChangeEvent) -> Result<i64> {
        let result = sqlx::query(&format!(
            "INSERT INTO change_history ({CHANGE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(event.site_id)
        .bind(event.previous_check_id)
        .bind(event.current_check_id)
        .bind(event.aspect.as_str())
        .bind(&event.description)
        .bind(&event.old_value)
        .bind(&event.new_value)
        .bind(event.severity.as_str())
        .bind(event.detected_at_ms as i64)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, sitewatch_common::ChannelKind};

    async fn make_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn fp(c: char) -> Fingerprint {
        Fingerprint::from_hex(c.to_string().repeat(64)).unwrap()
    }

    async fn add_site(store: &SqliteStore, name: &str) -> Site {
        store
            .add_site(&NewSite::new(name, format!("https://{name}.example.com")).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_and_get_site() {
        let store = make_store().await;
        let site = store
            .add_site(
                &NewSite::new("news", "https://example.com/news")
                    .unwrap()
                    .with_keywords(Some("sale, new".into()))
                    .with_interval_hours(6),
            )
            .await
            .unwrap();
        let loaded = store.get_site(site.id).await.unwrap();
        assert_eq!(loaded, site);
        assert_eq!(loaded.keywords.as_deref(), Some("sale, new"));
        assert_eq!(loaded.check_interval_hours, 6);
        assert!(loaded.active);
        assert_eq!(loaded.last_checked_ms, None);
    }

    #[tokio::test]
    async fn missing_site_is_not_found() {
        let store = make_store().await;
        assert!(matches!(
            store.get_site(42).await,
            Err(Error::SiteNotFound { site_id: 42 })
        ));
        assert!(matches!(
            store.update_last_checked(42, 1).await,
            Err(Error::SiteNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn active_sites_never_checked_first() {
        let store = make_store().await;
        let a = add_site(&store, "a").await;
        let b = add_site(&store, "b").await;
        let c = add_site(&store, "c").await;
        let d = add_site(&store, "d").await;
        store.update_last_checked(a.id, 2_000).await.unwrap();
        store.update_last_checked(b.id, 1_000).await.unwrap();
        store.set_site_active(d.id, false).await.unwrap();

        let ids: Vec<_> = store
            .load_active_sites()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
        assert_eq!(store.list_sites().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn invalid_site_rows_are_skipped() {
        let store = make_store().await;
        add_site(&store, "ok").await;
        sqlx::query(
            "INSERT INTO sites (name, url, created_at_ms) VALUES ('bad', 'not a url', 0)",
        )
        .execute(&store.pool)
        .await
        .unwrap();
        let sites = store.load_active_sites().await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "ok");
    }

    #[tokio::test]
    async fn records_come_back_newest_first() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        let first = CheckRecord::succeeded(
            site.id,
            fp('a'),
            10,
            200,
            15,
            false,
            StrategyKind::DirectHttp,
            1_000,
        );
        let failed = CheckRecord::failed(site.id, 0, Some(StrategyKind::RenderedBrowser), 2_000);
        let last = CheckRecord::succeeded(
            site.id,
            fp('b'),
            12,
            404,
            20,
            true,
            StrategyKind::AsyncHttp,
            3_000,
        );
        let id1 = store.append_check_record(&first).await.unwrap();
        store.append_check_record(&failed).await.unwrap();
        let id3 = store.append_check_record(&last).await.unwrap();
        assert!(id3 > id1);

        let records = store.load_recent_records(site.id, 10).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, Some(id3));
        assert_eq!(records[0].fingerprint, Some(fp('b')));
        assert_eq!(records[0].status_code, 404);
        assert!(records[0].keyword_matched);
        assert_eq!(records[0].strategy, Some(StrategyKind::AsyncHttp));
        assert!(!records[1].is_success());
        assert_eq!(records[2].created_at_ms, 1_000);

        let limited = store.load_recent_records(site.id, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].created_at_ms, 2_000);
    }

    #[tokio::test]
    async fn same_timestamp_orders_by_id() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        for c in ['a', 'b'] {
            let rec =
                CheckRecord::succeeded(site.id, fp(c), 1, 200, 1, false, StrategyKind::DirectHttp, 5);
            store.append_check_record(&rec).await.unwrap();
        }
        let records = store.load_recent_records(site.id, 2).await.unwrap();
        assert_eq!(records[0].fingerprint, Some(fp('b')));
    }

    #[tokio::test]
    async fn subscribers_use_flag_defaults_and_skip_inactive() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        let other = add_site(&store, "o").await;

        let plain = store
            .add_subscriber(&NewSubscriber {
                email: Some("a@example.com".into()),
                ..NewSubscriber::default()
            })
            .await
            .unwrap();
        let line = store
            .add_subscriber(&NewSubscriber {
                line_user_id: Some("U123".into()),
                email_enabled: Some(false),
                line_enabled: Some(true),
                ..NewSubscriber::default()
            })
            .await
            .unwrap();
        let gone = store
            .add_subscriber(&NewSubscriber::default())
            .await
            .unwrap();
        for id in [plain.id, line.id, gone.id] {
            store.subscribe(id, site.id).await.unwrap();
        }
        store.subscribe(plain.id, site.id).await.unwrap();
        store.subscribe(plain.id, other.id).await.unwrap();
        sqlx::query("UPDATE subscribers SET active = 0 WHERE id = ?")
            .bind(gone.id)
            .execute(&store.pool)
            .await
            .unwrap();

        let subs = store.load_subscribers(site.id).await.unwrap();
        assert_eq!(subs, vec![plain.clone(), line]);
        assert!(subs[0].email_enabled);
        assert!(!subs[0].line_enabled);
        assert_eq!(store.load_subscribers(other.id).await.unwrap(), vec![plain]);
    }

    #[tokio::test]
    async fn subscribe_checks_both_ends() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        assert!(matches!(
            store.subscribe(99, site.id).await,
            Err(Error::SubscriberNotFound { subscriber_id: 99 })
        ));
        let sub = store.add_subscriber(&NewSubscriber::default()).await.unwrap();
        assert!(matches!(
            store.subscribe(sub.id, 77).await,
            Err(Error::SiteNotFound { site_id: 77 })
        ));
    }

    #[tokio::test]
    async fn notification_log_round_trips() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        let sent = NotificationRecord {
            subscriber_id: 1,
            site_id: site.id,
            channel: ChannelKind::Email,
            message: "changed".into(),
            status: NotificationStatus::Sent,
            error: None,
            created_at_ms: 10,
        };
        let failed = NotificationRecord {
            channel: ChannelKind::Line,
            status: NotificationStatus::Failed,
            error: Some("401 Unauthorized".into()),
            created_at_ms: 20,
            ..sent.clone()
        };
        store.record_notification(&sent).await.unwrap();
        store.record_notification(&failed).await.unwrap();

        let log = store.load_notifications(site.id, 10).await.unwrap();
        assert_eq!(log, vec![failed, sent]);
    }

    #[tokio::test]
    async fn successful_records_skip_any_number_of_failures() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        let ok = |c, at| {
            CheckRecord::succeeded(site.id, fp(c), 1, 200, 1, false, StrategyKind::DirectHttp, at)
        };
        store.append_check_record(&ok('a', 1)).await.unwrap();
        for at in 2..12 {
            let down = CheckRecord::failed(site.id, 503, Some(StrategyKind::DirectHttp), at);
            store.append_check_record(&down).await.unwrap();
        }
        store.append_check_record(&ok('b', 12)).await.unwrap();

        let recent = store.load_recent_records(site.id, 5).await.unwrap();
        assert_eq!(recent.iter().filter(|r| r.is_success()).count(), 1);

        let successes = store.load_successful_records(site.id, 5).await.unwrap();
        let fps: Vec<_> = successes.into_iter().filter_map(|r| r.fingerprint).collect();
        assert_eq!(fps, vec![fp('b'), fp('a')]);
    }

    #[tokio::test]
    async fn change_history_round_trips() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        let outage = ChangeEvent {
            site_id: site.id,
            previous_check_id: Some(1),
            current_check_id: Some(2),
            aspect: ChangeAspect::Availability,
            description: "Site encountered an error".into(),
            old_value: Some("200".into()),
            new_value: Some("503".into()),
            severity: ChangeSeverity::Critical,
            detected_at_ms: 10,
        };
        let content = ChangeEvent {
            previous_check_id: None,
            aspect: ChangeAspect::Content,
            description: "Content changed".into(),
            old_value: None,
            new_value: None,
            severity: ChangeSeverity::High,
            detected_at_ms: 20,
            ..outage.clone()
        };
        store.record_change(&outage).await.unwrap();
        store.record_change(&content).await.unwrap();

        let log = store.load_change_history(site.id, 10).await.unwrap();
        assert_eq!(log, vec![content, outage]);
        assert!(store.load_change_history(site.id + 1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_channel_in_log_names_the_site() {
        let store = make_store().await;
        let site = add_site(&store, "s").await;
        sqlx::query(
            "INSERT INTO notifications (subscriber_id, site_id, channel, message, status, created_at_ms)
             VALUES (1, ?, 'pager', 'm', 'sent', 0)",
        )
        .bind(site.id)
        .execute(&store.pool)
        .await
        .unwrap();
        let err = store.load_notifications(site.id, 10).await.unwrap_err();
        assert!(matches!(err, Error::Message { .. }));
        assert!(err.to_string().contains(&format!("site {}", site.id)));
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let store = make_store().await;
        crate::run_migrations(&store.pool).await.unwrap();
        add_site(&store, "s").await;
    }
}
