//! One-off check of a URL with nothing persisted.

use {
    sitewatch_common::{Fingerprint, StrategyKind},
    sitewatch_content::{ContentNormalizer, KeywordMatch, fingerprint, match_keywords},
    sitewatch_fetch::FetchEngine,
};

use crate::summary::preview;

/// What a single fetch of a URL would record.
#[derive(Debug, Clone)]
pub struct InspectReport {
    pub url: String,
    pub success: bool,
    pub strategy: StrategyKind,
    pub status_code: u16,
    pub latency_ms: u64,
    /// `(strategy, error)` for every attempt that failed, in order.
    pub failures: Vec<(StrategyKind, String)>,
    pub fingerprint: Option<Fingerprint>,
    pub content_length: u64,
    pub keywords: KeywordMatch,
    pub preview: String,
}

/// Fetch `url`, normalize it and match `keywords`.
pub async fn inspect(
    engine: &FetchEngine,
    url: &str,
    keywords: Option<&str>,
    preview_chars: usize,
) -> InspectReport {
    let scrape = engine.fetch(url).await;
    let mut failures: Vec<(StrategyKind, String)> = scrape
        .attempts
        .iter()
        .map(|a| (a.strategy, a.error.to_string()))
        .collect();

    if !scrape.success {
        if let Some(e) = &scrape.error {
            failures.push((scrape.strategy, e.to_string()));
        }
        return InspectReport {
            url: url.to_string(),
            success: false,
            strategy: scrape.strategy,
            status_code: scrape.status_code,
            latency_ms: scrape.latency_ms(),
            failures,
            fingerprint: None,
            content_length: 0,
            keywords: KeywordMatch::default(),
            preview: String::new(),
        };
    }

    let text = ContentNormalizer::new().normalize(&scrape.body, scrape.strategy);
    InspectReport {
        url: url.to_string(),
        success: true,
        strategy: scrape.strategy,
        status_code: scrape.status_code,
        latency_ms: scrape.latency_ms(),
        failures,
        fingerprint: Some(fingerprint(&text)),
        content_length: text.chars().count() as u64,
        keywords: match_keywords(&text, keywords),
        preview: preview(&text, preview_chars),
    }
}
