//! Persistence for sites, subscribers, check history and the notification
//! log.
//!
//! [`PersistenceGateway`] is what the monitor talks to. [`SqliteStore`] is the
//! production backend; [`InMemoryStore`] backs tests.

pub mod error;
pub mod gateway;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use {
    error::{Error, Result},
    gateway::PersistenceGateway,
    store_memory::InMemoryStore,
    store_sqlite::SqliteStore,
    types::{NewSite, NewSubscriber},
};

/// Run database migrations for the store.
///
/// Creates the `sites`, `subscribers`, `site_subscriptions`, `check_records`,
/// `notifications` and `change_history` tables. Safe to call repeatedly.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
