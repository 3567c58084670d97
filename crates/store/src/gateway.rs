use {
    async_trait::async_trait,
    sitewatch_common::{ChangeEvent, CheckRecord, NotificationRecord, Site, SiteId, Subscriber},
};

use crate::Result;

/// Storage seen by the monitor.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Active sites, never-checked first, then least recently checked.
    async fn load_active_sites(&self) -> Result<Vec<Site>>;

    /// Append a check record and return its id.
    async fn append_check_record(&self, record: &CheckRecord) -> Result<i64>;

    /// Up to `limit` records for the site, newest first.
    async fn load_recent_records(&self, site_id: SiteId, limit: u32) -> Result<Vec<CheckRecord>>;

    /// Up to `limit` successful records for the site, newest first. Failed
    /// fetches in between are skipped however many there are.
    async fn load_successful_records(
        &self,
        site_id: SiteId,
        limit: u32,
    ) -> Result<Vec<CheckRecord>>;

    /// Active subscribers of the site.
    async fn load_subscribers(&self, site_id: SiteId) -> Result<Vec<Subscriber>>;

    async fn update_last_checked(&self, site_id: SiteId, at_ms: u64) -> Result<()>;

    async fn record_notification(&self, record: &NotificationRecord) -> Result<i64>;

    /// Append one entry to the site's change history.
    async fn record_change(&self, event: &ChangeEvent) -> Result<i64>;

    /// Release connections. The store must not be used afterwards.
    async fn close(&self);
}
