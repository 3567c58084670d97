//! Cheapest strategy: one pooled client shared by every request.

use std::time::Duration;

use {
    async_trait::async_trait, sitewatch_common::StrategyKind, sitewatch_config::FetchConfig,
    url::Url,
};

use crate::{
    client::{ClientProfile, build_client, decode_body, read_capped},
    error::{FetchError, Result},
    strategy::FetchStrategy,
    types::FetchedPage,
};

/// Plain GET through a long-lived connection pool. Tolerates broken TLS
/// certificates when `accept_invalid_certs` is set.
pub struct DirectHttpStrategy {
    client: reqwest::Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl DirectHttpStrategy {
    pub fn new(cfg: &FetchConfig) -> Result<Self> {
        let client = build_client(cfg, ClientProfile {
            accept_invalid_certs: cfg.accept_invalid_certs,
            pooled: true,
        })?;
        Ok(Self {
            client,
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_body_bytes: cfg.max_body_bytes,
        })
    }
}

#[async_trait]
impl FetchStrategy for DirectHttpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectHttp
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedPage> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status_code = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers = resp.headers().clone();
        let bytes = read_capped(resp, self.max_body_bytes, self.timeout).await?;

        Ok(FetchedPage {
            body: decode_body(&bytes, &headers),
            status_code,
            final_url: Some(final_url),
        })
    }
}
