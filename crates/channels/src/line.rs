//! LINE Messaging API push delivery.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    sitewatch_common::ChannelKind,
    sitewatch_config::LineConfig,
    tracing::debug,
};

use crate::{
    Error, Result,
    channel::NotificationChannel,
    message::NotificationMessage,
};

/// Text message length limit of the push API, in characters.
pub const LINE_MAX_TEXT_CHARS: usize = 5000;

pub struct LineChannel {
    http: reqwest::Client,
    token: Secret<String>,
    api_base: String,
}

impl LineChannel {
    pub fn new(config: &LineConfig) -> Result<Self> {
        let token = config
            .channel_access_token
            .clone()
            .filter(|t| !t.expose_secret().is_empty())
            .ok_or_else(|| Error::not_configured("LINE channel access token is not configured"))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::transport("failed to build LINE HTTP client", e))?;
        Ok(Self {
            http,
            token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

/// Cut `text` to at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl NotificationChannel for LineChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Line
    }

    async fn send(&self, destination: &str, message: &NotificationMessage) -> Result<()> {
        if destination.trim().is_empty() {
            return Err(Error::invalid_destination(destination, "empty LINE user id"));
        }
        let payload = serde_json::json!({
            "to": destination,
            "messages": [{
                "type": "text",
                "text": truncate_chars(&message.text, LINE_MAX_TEXT_CHARS),
            }],
        });

        let resp = self
            .http
            .post(format!("{}/v2/bot/message/push", self.api_base))
            .bearer_auth(self.token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::transport("LINE push request", e))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::rejected("LINE push", status, body));
        }
        debug!(site_id = message.site_id, "LINE push delivered");
        Ok(())
    }
}
