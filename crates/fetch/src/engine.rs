//! Ordered fallback over fetch strategies.

use std::{sync::Arc, time::Instant};

use {
    sitewatch_browser::{BrowserConfig, RenderSession, RenderWaits},
    sitewatch_common::StrategyKind,
    sitewatch_config::SitewatchConfig,
    tracing::{debug, info, warn},
};

use crate::{
    direct::DirectHttpStrategy,
    error::{FetchError, Result},
    rendered::RenderedBrowserStrategy,
    strategy::FetchStrategy,
    streaming::AsyncHttpStrategy,
    types::{FailedAttempt, ScrapeResult},
};

/// Tries each strategy in order and returns the first success.
pub struct FetchEngine {
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl FetchEngine {
    pub fn new(strategies: Vec<Box<dyn FetchStrategy>>) -> Result<Self> {
        if strategies.is_empty() {
            return Err(FetchError::NoStrategies);
        }
        Ok(Self { strategies })
    }

    /// Build the configured chain. The browser session is only created when
    /// the rendered strategy is part of it.
    pub fn from_config(config: &SitewatchConfig) -> Result<Self> {
        let mut strategies: Vec<Box<dyn FetchStrategy>> = Vec::new();
        let mut session: Option<Arc<RenderSession>> = None;

        for kind in config.effective_strategies() {
            let strategy: Box<dyn FetchStrategy> = match kind {
                StrategyKind::DirectHttp => Box::new(DirectHttpStrategy::new(&config.fetch)?),
                StrategyKind::AsyncHttp => Box::new(AsyncHttpStrategy::new(&config.fetch)),
                StrategyKind::RenderedBrowser => {
                    let session = session
                        .get_or_insert_with(|| {
                            Arc::new(RenderSession::new(BrowserConfig::from(config)))
                        })
                        .clone();
                    Box::new(RenderedBrowserStrategy::new(
                        session,
                        RenderWaits::from(config),
                        std::time::Duration::from_secs(config.render.timeout_secs),
                    ))
                },
            };
            strategies.push(strategy);
        }
        Self::new(strategies)
    }

    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run the chain against `url`. Never errors: failures are reported in
    /// the returned [`ScrapeResult`].
    pub async fn fetch(&self, url: &str) -> ScrapeResult {
        let first = self.strategies[0].kind();
        let parsed = match sitewatch_common::validate_url(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(url, error = %e, "refusing to fetch invalid url");
                return ScrapeResult::failed(
                    first,
                    FetchError::InvalidUrl(e.to_string()),
                    std::time::Duration::ZERO,
                    Vec::new(),
                );
            },
        };

        let mut failures: Vec<FailedAttempt> = Vec::new();
        for strategy in &self.strategies {
            let kind = strategy.kind();
            let budget = strategy.timeout();
            debug!(url, strategy = %kind, "attempting fetch");

            let started = Instant::now();
            let outcome = match tokio::time::timeout(budget, strategy.attempt(&parsed)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(FetchError::Timeout(budget)),
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(page) => {
                    info!(
                        url,
                        strategy = %kind,
                        status = page.status_code,
                        bytes = page.body.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "fetch succeeded"
                    );
                    return ScrapeResult::succeeded(kind, page, elapsed, failures);
                },
                Err(error) => {
                    warn!(url, strategy = %kind, error = %error, "fetch strategy failed");
                    failures.push(FailedAttempt {
                        strategy: kind,
                        error,
                        elapsed,
                    });
                },
            }
        }

        // `strategies` is non-empty, so at least one failure was recorded.
        match failures.pop() {
            Some(last) => ScrapeResult::failed(last.strategy, last.error, last.elapsed, failures),
            None => ScrapeResult::failed(
                first,
                FetchError::NoStrategies,
                std::time::Duration::ZERO,
                failures,
            ),
        }
    }

    /// Release strategy resources (the browser, if one was launched).
    pub async fn shutdown(&self) {
        for strategy in &self.strategies {
            strategy.shutdown().await;
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::FetchedPage,
        async_trait::async_trait,
        std::{
            sync::atomic::{AtomicUsize, Ordering},
            time::Duration,
        },
        url::Url,
    };

    enum Behavior {
        Succeed,
        Fail,
        Hang,
    }

    struct Scripted {
        kind: StrategyKind,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FetchStrategy for Scripted {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn attempt(&self, url: &Url) -> Result<FetchedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(FetchedPage {
                    body: format!("<p>{} via {}</p>", url, self.kind),
                    status_code: 200,
                    final_url: None,
                }),
                Behavior::Fail => Err(FetchError::transport("connection refused")),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    unreachable!("engine should time out first")
                },
            }
        }

        async fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        engine: FetchEngine,
        calls: Vec<Arc<AtomicUsize>>,
        shutdowns: Arc<AtomicUsize>,
    }

    fn harness(behaviors: Vec<Behavior>) -> Harness {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let mut calls = Vec::new();
        let strategies = behaviors
            .into_iter()
            .zip(StrategyKind::ALL)
            .map(|(behavior, kind)| {
                let counter = Arc::new(AtomicUsize::new(0));
                calls.push(counter.clone());
                Box::new(Scripted {
                    kind,
                    behavior,
                    calls: counter,
                    shutdowns: shutdowns.clone(),
                }) as Box<dyn FetchStrategy>
            })
            .collect();
        Harness {
            engine: FetchEngine::new(strategies).unwrap(),
            calls,
            shutdowns,
        }
    }

    fn counts(h: &Harness) -> Vec<usize> {
        h.calls.iter().map(|c| c.load(Ordering::SeqCst)).collect()
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(matches!(
            FetchEngine::new(Vec::new()),
            Err(FetchError::NoStrategies)
        ));
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let h = harness(vec![Behavior::Succeed, Behavior::Succeed, Behavior::Succeed]);
        let result = h.engine.fetch("https://example.com").await;
        assert!(result.success);
        assert_eq!(result.strategy, StrategyKind::DirectHttp);
        assert_eq!(counts(&h), vec![1, 0, 0]);
        assert!(result.attempts.is_empty());
    }

    #[tokio::test]
    async fn falls_through_to_last_strategy() {
        let h = harness(vec![Behavior::Fail, Behavior::Fail, Behavior::Succeed]);
        let result = h.engine.fetch("https://example.com").await;
        assert!(result.success);
        assert_eq!(result.strategy, StrategyKind::RenderedBrowser);
        assert_eq!(counts(&h), vec![1, 1, 1]);
        assert_eq!(result.tried(), StrategyKind::ALL.to_vec());
        assert!(result.body.contains("rendered-browser"));
    }

    #[tokio::test]
    async fn all_failures_surface_last_error() {
        let h = harness(vec![Behavior::Fail, Behavior::Fail, Behavior::Hang]);
        let result = h.engine.fetch("https://example.com").await;
        assert!(!result.success);
        assert_eq!(result.strategy, StrategyKind::RenderedBrowser);
        assert!(matches!(result.error, Some(FetchError::Timeout(_))));
        assert_eq!(result.attempts.len(), 2);
        assert_eq!(result.status_code, 0);
        assert!(result.body.is_empty());
    }

    #[tokio::test]
    async fn hung_strategy_times_out_and_chain_continues() {
        let h = harness(vec![Behavior::Hang, Behavior::Succeed]);
        let result = h.engine.fetch("https://example.com").await;
        assert!(result.success);
        assert_eq!(result.strategy, StrategyKind::AsyncHttp);
        assert!(matches!(
            result.attempts[0].error,
            FetchError::Timeout(d) if d == Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn invalid_url_invokes_nothing() {
        let h = harness(vec![Behavior::Succeed]);
        let result = h.engine.fetch("ftp://example.com").await;
        assert!(!result.success);
        assert!(matches!(result.error, Some(FetchError::InvalidUrl(_))));
        assert_eq!(counts(&h), vec![0]);
    }

    #[tokio::test]
    async fn shutdown_reaches_every_strategy() {
        let h = harness(vec![Behavior::Fail, Behavior::Succeed]);
        h.engine.shutdown().await;
        assert_eq!(h.shutdowns.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn config_chain_respects_render_toggle() {
        let mut cfg = SitewatchConfig::default();
        assert_eq!(
            FetchEngine::from_config(&cfg).unwrap().strategies(),
            StrategyKind::ALL.to_vec()
        );
        cfg.render.enabled = false;
        assert_eq!(FetchEngine::from_config(&cfg).unwrap().strategies(), vec![
            StrategyKind::DirectHttp,
            StrategyKind::AsyncHttp
        ]);
    }
}
