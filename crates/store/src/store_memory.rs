//! In-memory store for tests and dry runs.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use {
    async_trait::async_trait,
    sitewatch_common::{
        ChangeEvent, CheckRecord, NotificationRecord, Site, SiteId, Subscriber, SubscriberId,
    },
};

use crate::{
    error::{Error, Result},
    gateway::PersistenceGateway,
    types::{NewSite, NewSubscriber},
};

#[derive(Default)]
struct State {
    sites: BTreeMap<SiteId, Site>,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
    subscriptions: BTreeSet<(SiteId, SubscriberId)>,
    records: Vec<CheckRecord>,
    notifications: Vec<NotificationRecord>,
    changes: Vec<ChangeEvent>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Map-backed store. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a fully built site, keeping its id.
    pub fn insert_site(&self, site: Site) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(site.id);
        state.sites.insert(site.id, site);
    }

    pub fn add_site(&self, site: &NewSite) -> Result<Site> {
        let mut state = self.lock();
        let id = state.next_id();
        let built = Site::new(id, site.name.clone(), site.url.clone())?
            .with_keywords(site.keywords.clone().unwrap_or_default())
            .with_interval_hours(site.check_interval_hours);
        state.sites.insert(id, built.clone());
        Ok(built)
    }

    /// Insert a fully built subscriber and subscribe it to `sites`.
    pub fn insert_subscriber(&self, subscriber: Subscriber, sites: &[SiteId]) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(subscriber.id);
        for site_id in sites {
            state.subscriptions.insert((*site_id, subscriber.id));
        }
        state.subscribers.insert(subscriber.id, subscriber);
    }

    pub fn add_subscriber(&self, subscriber: &NewSubscriber) -> Subscriber {
        let mut state = self.lock();
        let id = state.next_id();
        let built = Subscriber {
            id,
            email: subscriber.email.clone(),
            line_user_id: subscriber.line_user_id.clone(),
            email_enabled: subscriber.email_enabled(),
            line_enabled: subscriber.line_enabled(),
            active: true,
        };
        state.subscribers.insert(id, built.clone());
        built
    }

    pub fn subscribe(&self, subscriber_id: SubscriberId, site_id: SiteId) -> Result<()> {
        let mut state = self.lock();
        if !state.sites.contains_key(&site_id) {
            return Err(Error::site_not_found(site_id));
        }
        if !state.subscribers.contains_key(&subscriber_id) {
            return Err(Error::subscriber_not_found(subscriber_id));
        }
        state.subscriptions.insert((site_id, subscriber_id));
        Ok(())
    }

    pub fn site(&self, site_id: SiteId) -> Option<Site> {
        self.lock().sites.get(&site_id).cloned()
    }

    /// Every appended record, oldest first.
    pub fn records(&self) -> Vec<CheckRecord> {
        self.lock().records.clone()
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.lock().notifications.clone()
    }

    /// Every recorded change, oldest first.
    pub fn changes(&self) -> Vec<ChangeEvent> {
        self.lock().changes.clone()
    }

    fn site_records(&self, site_id: SiteId, limit: u32, successful_only: bool) -> Vec<CheckRecord> {
        let state = self.lock();
        let mut records: Vec<CheckRecord> = state
            .records
            .iter()
            .filter(|r| r.site_id == site_id && (!successful_only || r.is_success()))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then_with(|| b.id.cmp(&a.id))
        });
        records.truncate(limit as usize);
        records
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryStore {
    async fn load_active_sites(&self) -> Result<Vec<Site>> {
        let state = self.lock();
        let mut sites: Vec<Site> = state.sites.values().filter(|s| s.active).cloned().collect();
        // `None` sorts before `Some`, so never-checked sites come first.
        sites.sort_by_key(|s| (s.last_checked_ms, s.id));
        Ok(sites)
    }

    async fn append_check_record(&self, record: &CheckRecord) -> Result<i64> {
        let mut state = self.lock();
        let id = state.next_id();
        let mut stored = record.clone();
        stored.id = Some(id);
        state.records.push(stored);
        Ok(id)
    }

    async fn load_recent_records(&self, site_id: SiteId, limit: u32) -> Result<Vec<CheckRecord>> {
        Ok(self.site_records(site_id, limit, false))
    }

    async fn load_successful_records(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<CheckRecord>> {
        Ok(self.site_records(site_id, limit, true))
    }

    async fn load_subscribers(&self, site_id: SiteId) -> Result<Vec<Subscriber>> {
        let state = self.lock();
        Ok(state
            .subscriptions
            .iter()
            .filter(|(site, _)| *site == site_id)
            .filter_map(|(_, sub)| state.subscribers.get(sub))
            .filter(|s| s.active)
            .cloned()
            .collect())
    }

    async fn update_last_checked(&self, site_id: SiteId, at_ms: u64) -> Result<()> {
        let mut state = self.lock();
        let site = state
            .sites
            .get_mut(&site_id)
            .ok_or_else(|| Error::site_not_found(site_id))?;
        site.last_checked_ms = Some(at_ms);
        Ok(())
    }

    async fn record_notification(&self, record: &NotificationRecord) -> Result<i64> {
        let mut state = self.lock();
        let id = state.next_id();
        state.notifications.push(record.clone());
        Ok(id)
    }

    async fn record_change(&self, event: &ChangeEvent) -> Result<i64> {
        let mut state = self.lock();
        let id = state.next_id();
        state.changes.push(event.clone());
        Ok(id)
    }

    async fn close(&self) {}
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        sitewatch_common::{Fingerprint, StrategyKind},
    };

    fn site(id: SiteId, last: Option<u64>) -> Site {
        let mut site = Site::new(id, format!("site-{id}"), "https://example.com").unwrap();
        site.last_checked_ms = last;
        site
    }

    #[tokio::test]
    async fn ordering_matches_sqlite_store() {
        let store = InMemoryStore::new();
        store.insert_site(site(1, Some(500)));
        store.insert_site(site(2, None));
        store.insert_site(site(3, Some(100)));
        let mut inactive = site(4, None);
        inactive.active = false;
        store.insert_site(inactive);

        let ids: Vec<_> = store
            .load_active_sites()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn ids_do_not_collide_with_inserted_sites() {
        let store = InMemoryStore::new();
        store.insert_site(site(10, None));
        let added = store
            .add_site(&NewSite::new("n", "https://example.org").unwrap())
            .unwrap();
        assert_eq!(added.id, 11);
    }

    #[tokio::test]
    async fn recent_records_newest_first_and_limited() {
        let store = InMemoryStore::new();
        store.insert_site(site(1, None));
        let fp = Fingerprint::from_hex("a".repeat(64)).unwrap();
        for at in [100, 300, 200] {
            let rec = CheckRecord::succeeded(
                1,
                fp.clone(),
                1,
                200,
                1,
                false,
                StrategyKind::DirectHttp,
                at,
            );
            store.append_check_record(&rec).await.unwrap();
        }
        store
            .append_check_record(&CheckRecord::failed(2, 0, None, 999))
            .await
            .unwrap();

        let recent = store.load_recent_records(1, 2).await.unwrap();
        let times: Vec<_> = recent.iter().map(|r| r.created_at_ms).collect();
        assert_eq!(times, vec![300, 200]);
        assert!(recent.iter().all(|r| r.id.is_some()));
    }

    #[tokio::test]
    async fn successful_records_ignore_failures() {
        let store = InMemoryStore::new();
        store.insert_site(site(1, None));
        let fp = Fingerprint::from_hex("b".repeat(64)).unwrap();
        let ok = CheckRecord::succeeded(1, fp, 1, 200, 1, false, StrategyKind::DirectHttp, 1);
        store.append_check_record(&ok).await.unwrap();
        for at in 2..8 {
            store
                .append_check_record(&CheckRecord::failed(1, 500, None, at))
                .await
                .unwrap();
        }

        let successes = store.load_successful_records(1, 3).await.unwrap();
        assert_eq!(successes.len(), 1);
        assert_eq!(successes[0].created_at_ms, 1);
        assert!(
            store
                .load_recent_records(1, 3)
                .await
                .unwrap()
                .iter()
                .all(|r| !r.is_success())
        );
    }

    #[tokio::test]
    async fn subscribers_filtered_by_site_and_active() {
        let store = InMemoryStore::new();
        store.insert_site(site(1, None));
        store.insert_site(site(2, None));
        store.insert_subscriber(Subscriber::new(10).with_email("a@example.com"), &[1]);
        let mut inactive = Subscriber::new(11);
        inactive.active = false;
        store.insert_subscriber(inactive, &[1]);
        store.insert_subscriber(Subscriber::new(12), &[2]);

        let subs = store.load_subscribers(1).await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].id, 10);
    }

    #[tokio::test]
    async fn update_last_checked_requires_site() {
        let store = InMemoryStore::new();
        store.insert_site(site(1, None));
        store.update_last_checked(1, 42).await.unwrap();
        assert_eq!(store.site(1).unwrap().last_checked_ms, Some(42));
        assert!(matches!(
            store.update_last_checked(9, 1).await,
            Err(Error::SiteNotFound { site_id: 9 })
        ));
    }

    #[test]
    fn subscribe_validates_ids() {
        let store = InMemoryStore::new();
        let site = store
            .add_site(&NewSite::new("n", "https://example.org").unwrap())
            .unwrap();
        let sub = store.add_subscriber(&NewSubscriber::default());
        store.subscribe(sub.id, site.id).unwrap();
        assert!(store.subscribe(sub.id, 999).is_err());
        assert!(store.subscribe(999, site.id).is_err());
    }
}
