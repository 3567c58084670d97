//! Gmail REST API delivery with an OAuth2 refresh token.

use std::time::{Duration, Instant};

use {
    async_trait::async_trait,
    base64::{
        Engine,
        engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    sitewatch_common::ChannelKind,
    sitewatch_config::EmailConfig,
    tracing::debug,
};

use crate::{Error, Result, channel::NotificationChannel, message::NotificationMessage};

#[derive(Clone)]
struct CachedAccessToken {
    token: Secret<String>,
    expires_at: Instant,
}

impl CachedAccessToken {
    fn is_valid(&self) -> bool {
        let refresh_skew = Duration::from_secs(60);
        self.expires_at > Instant::now() + refresh_skew
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct Credentials {
    client_id: String,
    client_secret: Secret<String>,
    refresh_token: Secret<String>,
}

pub struct GmailChannel {
    http: reqwest::Client,
    credentials: Credentials,
    sender: Option<String>,
    token_url: String,
    api_base: String,
    token_cache: tokio::sync::Mutex<Option<CachedAccessToken>>,
}

impl GmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        if !config.has_credentials() {
            return Err(Error::not_configured(
                "Gmail client_id, client_secret and refresh_token are required",
            ));
        }
        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            config.client_id.clone(),
            config.client_secret.clone(),
            config.refresh_token.clone(),
        ) else {
            return Err(Error::not_configured("Gmail credentials are incomplete"));
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::transport("failed to build Gmail HTTP client", e))?;
        Ok(Self {
            http,
            credentials: Credentials {
                client_id,
                client_secret,
                refresh_token,
            },
            sender: config.sender.clone().filter(|s| !s.trim().is_empty()),
            token_url: config.token_url.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token_cache: tokio::sync::Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<Secret<String>> {
        {
            let guard = self.token_cache.lock().await;
            if let Some(token) = guard.as_ref()
                && token.is_valid()
            {
                return Ok(token.token.clone());
            }
        }

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret().as_str(),
            ),
            (
                "refresh_token",
                self.credentials.refresh_token.expose_secret().as_str(),
            ),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::transport("Gmail token request", e))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::rejected("Gmail token", status, body));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::transport("Gmail token response", e))?;
        let ttl = body.expires_in.unwrap_or(3600).max(120);
        let cached = CachedAccessToken {
            token: Secret::new(body.access_token),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        };
        let token = cached.token.clone();
        debug!(ttl_secs = ttl, "refreshed Gmail access token");

        let mut guard = self.token_cache.lock().await;
        *guard = Some(cached);
        Ok(token)
    }
}

#[async_trait]
impl NotificationChannel for GmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, destination: &str, message: &NotificationMessage) -> Result<()> {
        let to = destination.trim();
        if to.is_empty() || to.contains(|c: char| c == '\r' || c == '\n') || !to.contains('@') {
            return Err(Error::invalid_destination(
                destination,
                "not a single email address",
            ));
        }
        let token = self.access_token().await?;
        let mime = build_mime(
            self.sender.as_deref(),
            to,
            message,
            &boundary_for(message),
        );
        let payload = serde_json::json!({ "raw": URL_SAFE_NO_PAD.encode(mime) });

        let resp = self
            .http
            .post(format!("{}/gmail/v1/users/me/messages/send", self.api_base))
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport("Gmail send request", e))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::rejected("Gmail send", status, body));
        }
        debug!(site_id = message.site_id, "email delivered");
        Ok(())
    }
}

// ── MIME ────────────────────────────────────────────────────────────────────

/// `=_` never occurs in base64 bodies, so the boundary cannot collide.
fn boundary_for(message: &NotificationMessage) -> String {
    format!("=_sitewatch_{}_{}", message.site_id, message.detected_at_ms)
}

/// RFC 2047 encoded-word for non-ASCII header values.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

/// Base64 with 76-character lines.
fn base64_lines(body: &str) -> String {
    let encoded = STANDARD.encode(body);
    encoded
        .as_bytes()
        .chunks(76)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn build_mime(
    sender: Option<&str>,
    to: &str,
    message: &NotificationMessage,
    boundary: &str,
) -> String {
    let mut out = String::new();
    if let Some(from) = sender {
        out.push_str(&format!("From: {from}\r\n"));
    }
    out.push_str(&format!("To: {to}\r\n"));
    out.push_str(&format!("Subject: {}\r\n", encode_header(&message.subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{boundary}\"\r\n\r\n"
    ));
    for (content_type, body) in [("text/plain", &message.text), ("text/html", &message.html)] {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!("Content-Type: {content_type}; charset=UTF-8\r\n"));
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&base64_lines(body));
        out.push_str("\r\n");
    }
    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::message::MessageBuilder,
        mockito::Matcher,
        sitewatch_common::{ChangeKind, ChangeResult, Locale, Site},
    };

    fn config(base: &str) -> EmailConfig {
        EmailConfig {
            enabled: true,
            sender: Some("monitor@example.com".into()),
            client_id: Some("cid".into()),
            client_secret: Some(Secret::new("csecret".into())),
            refresh_token: Some(Secret::new("rtoken".into())),
            token_url: format!("{base}/token"),
            api_base: base.into(),
            timeout_secs: 5,
        }
    }

    fn message() -> NotificationMessage {
        let site = Site::new(3, "ニュース", "https://example.com/news").unwrap();
        MessageBuilder::new(Locale::Ja, chrono_tz::UTC, "更新のお知らせ").build(
            &site,
            &ChangeResult {
                has_changed: true,
                kind: ChangeKind::KeywordAppeared,
                ..ChangeResult::insufficient_data()
            },
            1_000,
        )
    }

    #[test]
    fn missing_credentials_are_not_configured() {
        let mut cfg = config("http://localhost");
        cfg.refresh_token = None;
        assert!(matches!(GmailChannel::new(&cfg), Err(Error::NotConfigured { .. })));
    }

    #[test]
    fn mime_has_both_parts_and_encoded_subject() {
        let msg = message();
        let mime = build_mime(Some("a@example.com"), "b@example.com", &msg, "=_b");
        assert!(mime.starts_with("From: a@example.com\r\nTo: b@example.com\r\n"));
        assert!(mime.contains(&format!(
            "Subject: =?UTF-8?B?{}?=\r\n",
            STANDARD.encode("更新のお知らせ")
        )));
        assert!(mime.contains("multipart/alternative; boundary=\"=_b\""));
        assert!(mime.contains("Content-Type: text/plain; charset=UTF-8"));
        assert!(mime.contains("Content-Type: text/html; charset=UTF-8"));
        assert!(mime.ends_with("--=_b--\r\n"));
        assert!(mime.contains(&STANDARD.encode(&msg.text)[..76]));
    }

    #[test]
    fn ascii_subject_is_left_alone() {
        assert_eq!(encode_header("Website Update Detected"), "Website Update Detected");
    }

    #[test]
    fn base64_body_lines_are_wrapped() {
        let long = "x".repeat(300);
        assert!(base64_lines(&long).split("\r\n").all(|l| l.len() <= 76));
    }

    #[tokio::test]
    async fn refreshes_token_once_and_sends() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "rtoken".into()),
                Matcher::UrlEncoded("client_id".into(), "cid".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"at-1","expires_in":3600,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;
        let send = server
            .mock("POST", "/gmail/v1/users/me/messages/send")
            .match_header("authorization", "Bearer at-1")
            .match_body(Matcher::Regex(r#"\{"raw":"[A-Za-z0-9_-]+"\}"#.into()))
            .with_status(200)
            .with_body(r#"{"id":"m1"}"#)
            .expect(2)
            .create_async()
            .await;

        let channel = GmailChannel::new(&config(&server.url())).unwrap();
        channel.send("user@example.com", &message()).await.unwrap();
        channel.send("user@example.com", &message()).await.unwrap();
        token.assert_async().await;
        send.assert_async().await;
    }

    #[tokio::test]
    async fn token_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let channel = GmailChannel::new(&config(&server.url())).unwrap();
        let err = channel.send("user@example.com", &message()).await.unwrap_err();
        assert!(matches!(err, Error::Rejected { service: "Gmail token", status: 400, .. }));
    }

    #[tokio::test]
    async fn rejects_header_injection_in_address() {
        let channel = GmailChannel::new(&config("http://127.0.0.1:9")).unwrap();
        let err = channel
            .send("a@example.com\r\nBcc: x@example.com", &message())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDestination { .. }));
    }
}
