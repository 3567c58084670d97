use std::time::Duration;

use sitewatch_common::StrategyKind;

use crate::error::FetchError;

/// What a strategy returns when it reaches the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub body: String,
    /// HTTP status, or 200 for rendered pages.
    pub status_code: u16,
    /// URL after redirects, when the strategy knows it.
    pub final_url: Option<String>,
}

/// A strategy that was tried and failed before the final outcome.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub strategy: StrategyKind,
    pub error: FetchError,
    pub elapsed: Duration,
}

/// Outcome of running the strategy chain against one URL.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub success: bool,
    pub body: String,
    /// 0 when no strategy produced a response.
    pub status_code: u16,
    /// Time spent in the returned strategy's attempt.
    pub elapsed: Duration,
    /// The strategy that succeeded, or the last one attempted.
    pub strategy: StrategyKind,
    pub final_url: Option<String>,
    pub error: Option<FetchError>,
    /// Failures that preceded the returned attempt, in order.
    pub attempts: Vec<FailedAttempt>,
}

impl ScrapeResult {
    pub(crate) fn succeeded(
        strategy: StrategyKind,
        page: FetchedPage,
        elapsed: Duration,
        attempts: Vec<FailedAttempt>,
    ) -> Self {
        Self {
            success: true,
            body: page.body,
            status_code: page.status_code,
            elapsed,
            strategy,
            final_url: page.final_url,
            error: None,
            attempts,
        }
    }

    pub(crate) fn failed(
        strategy: StrategyKind,
        error: FetchError,
        elapsed: Duration,
        attempts: Vec<FailedAttempt>,
    ) -> Self {
        Self {
            success: false,
            body: String::new(),
            status_code: 0,
            elapsed,
            strategy,
            final_url: None,
            error: Some(error),
            attempts,
        }
    }

    /// Every strategy that was invoked, in order.
    pub fn tried(&self) -> Vec<StrategyKind> {
        self.attempts
            .iter()
            .map(|a| a.strategy)
            .chain(std::iter::once(self.strategy))
            .collect()
    }

    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}
