//! Most capable strategy: drive a headless browser and read the rendered
//! text.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    sitewatch_browser::{RenderSession, RenderWaits},
    sitewatch_common::StrategyKind,
    url::Url,
};

use crate::{error::Result, strategy::FetchStrategy, types::FetchedPage};

/// The body is already client-rendered text, not markup.
pub struct RenderedBrowserStrategy {
    session: Arc<RenderSession>,
    waits: RenderWaits,
    timeout: Duration,
}

impl RenderedBrowserStrategy {
    pub fn new(session: Arc<RenderSession>, waits: RenderWaits, timeout: Duration) -> Self {
        Self {
            session,
            waits,
            timeout,
        }
    }
}

#[async_trait]
impl FetchStrategy for RenderedBrowserStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RenderedBrowser
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedPage> {
        let text = self.session.render_text(url.as_str(), self.waits).await?;
        Ok(FetchedPage {
            body: text,
            // A rendered page has no meaningful status of its own.
            status_code: 200,
            final_url: None,
        })
    }

    async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}
