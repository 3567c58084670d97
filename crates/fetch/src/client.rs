//! Shared reqwest setup for the HTTP strategies.

use std::time::Duration;

use {
    encoding_rs::Encoding,
    futures::StreamExt,
    reqwest::{
        header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue},
        redirect::Policy,
    },
    sitewatch_config::FetchConfig,
    tracing::debug,
};

use crate::error::{FetchError, Result};

/// TLS and pooling knobs that differ between the two HTTP strategies.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClientProfile {
    pub accept_invalid_certs: bool,
    pub pooled: bool,
}

/// Headers a desktop browser would send on a top-level navigation.
pub(crate) fn browser_headers(cfg: &FetchConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&cfg.accept_language)
            .map_err(|e| FetchError::Client(format!("accept_language: {e}")))?,
    );
    headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));
    Ok(headers)
}

pub(crate) fn build_client(cfg: &FetchConfig, profile: ClientProfile) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .default_headers(browser_headers(cfg)?)
        .user_agent(cfg.user_agent.as_str())
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .redirect(Policy::limited(cfg.max_redirects))
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .danger_accept_invalid_certs(profile.accept_invalid_certs);
    if !profile.pooled {
        builder = builder.pool_max_idle_per_host(0);
    }
    builder.build().map_err(|e| FetchError::Client(e.to_string()))
}

/// How far into the document a `<meta>` charset declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

/// Read the whole body, giving up as soon as it exceeds `limit` bytes.
pub(crate) async fn read_capped(
    resp: reqwest::Response,
    limit: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    if resp
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(FetchError::BodyTooLarge { limit });
    }

    let url = resp.url().clone();
    let mut body = Vec::new();
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::from_reqwest(e, timeout))?;
        if body.len() + chunk.len() > limit {
            debug!(url = %url, limit, "aborting oversized body");
            return Err(FetchError::BodyTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Decode a body using the charset from `Content-Type`, then a `<meta>`
/// declaration near the top of the document, defaulting to UTF-8.
pub(crate) fn decode_body(bytes: &[u8], headers: &HeaderMap) -> String {
    let encoding = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| meta_charset(bytes))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Covers both `<meta charset="...">` and the `http-equiv` form with
/// `content="text/html; charset=..."`.
fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    head.match_indices("<meta").find_map(|(start, _)| {
        let tag = &head[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        let (_, value) = tag.split_once("charset=")?;
        let label = value
            .trim_start_matches(['"', '\'', ' '])
            .split(|c: char| matches!(c, '"' | '\'' | ';' | '/') || c.is_whitespace())
            .next()?;
        Encoding::for_label(label.as_bytes())
    })
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then_some(value.trim().trim_matches('"'))
    })
}
