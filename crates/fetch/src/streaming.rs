//! Second strategy: a fresh client per attempt with strict TLS and a
//! streamed, size-capped body.

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

pub struct AsyncHttpStrategy {
    config: FetchConfig,
    timeout: Duration,
}

impl AsyncHttpStrategy {
    pub fn new(cfg: &FetchConfig) -> Self {
        Self {
            config: cfg.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }
}

#[async_trait]
impl FetchStrategy for AsyncHttpStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AsyncHttp
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn attempt(&self, url: &Url) -> Result<FetchedPage> {
        let client = build_client(&self.config, ClientProfile {
            accept_invalid_certs: false,
            pooled: false,
        })?;
        let resp = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status_code = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let headers = resp.headers().clone();
        let body = read_capped(resp, self.config.max_body_bytes, self.timeout).await?;

        Ok(FetchedPage {
            body: decode_body(&body, &headers),
            status_code,
            final_url: Some(final_url),
        })
    }
}
