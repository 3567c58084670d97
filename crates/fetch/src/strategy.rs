use std::time::Duration;

use {async_trait::async_trait, sitewatch_common::StrategyKind, url::Url};

use crate::{error::Result, types::FetchedPage};

/// One way of retrieving a page.
///
/// Any HTTP response counts as success; only transport failures, timeouts
/// and render failures are errors.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Hard budget for a single attempt, enforced by the engine.
    fn timeout(&self) -> Duration;

    async fn attempt(&self, url: &Url) -> Result<FetchedPage>;

    /// Release long-lived resources. Called once when the engine shuts down.
    async fn shutdown(&self) {}
}
