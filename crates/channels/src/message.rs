//! Notification text, built once per site change.

use {
    chrono_tz::Tz,
    sitewatch_common::{ChangeKind, ChangeResult, Locale, Site, SiteId, time::format_ms},
    sitewatch_config::SitewatchConfig,
};

/// A rendered notification, shared by every channel and subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub site_id: SiteId,
    pub site_name: String,
    pub url: String,
    pub kind: ChangeKind,
    pub detected_at_ms: u64,
    pub subject: String,
    /// Plain-text rendering, used by LINE and as the email text part.
    pub text: String,
    /// Rich rendering for the email HTML part.
    pub html: String,
}

/// Builds [`NotificationMessage`]s in one locale and time zone.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    locale: Locale,
    tz: Tz,
    subject: String,
}

struct Strings {
    heading: &'static str,
    site: &'static str,
    change: &'static str,
    detected_at: &'static str,
    body: &'static str,
    footer: &'static str,
}

const JA: Strings = Strings {
    heading: "ウェブサイト更新が検出されました",
    site: "サイト",
    change: "変更",
    detected_at: "検出時刻",
    body: "監視中のウェブサイトが更新されました。最新情報をご確認ください。",
    footer: "この通知は、ウェブサイト監視システムによって自動的に送信されました。",
};

const EN: Strings = Strings {
    heading: "Website update detected",
    site: "Site",
    change: "Change",
    detected_at: "Detected at",
    body: "A monitored website has been updated. Please check the latest content.",
    footer: "This notification was sent automatically by the website monitoring system.",
};

impl MessageBuilder {
    pub fn new(locale: Locale, tz: Tz, subject: impl Into<String>) -> Self {
        Self {
            locale,
            tz,
            subject: subject.into(),
        }
    }

    pub fn from_config(config: &SitewatchConfig) -> Self {
        Self::new(
            config.notifications.locale,
            config.timezone(),
            config.notifications.subject.clone(),
        )
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn build(
        &self,
        site: &Site,
        change: &ChangeResult,
        detected_at_ms: u64,
    ) -> NotificationMessage {
        let s = match self.locale {
            Locale::Ja => &JA,
            Locale::En => &EN,
        };
        let label = change.kind.label(self.locale);
        let timestamp = format_ms(detected_at_ms, &self.tz);

        let text = format!(
            "{heading}\n\n{site_l}: {name}\nURL: {url}\n{change_l}: {label}\n{at_l}: {timestamp}\n\n{body}\n\n{footer}",
            heading = s.heading,
            site_l = s.site,
            name = site.name,
            url = site.url,
            change_l = s.change,
            at_l = s.detected_at,
            body = s.body,
            footer = s.footer,
        );

        let html = format!(
            concat!(
                "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">",
                "<h2 style=\"color: #333;\">{heading}</h2>",
                "<div style=\"background: #fff; padding: 15px; border-left: 4px solid #007bff;\">",
                "<p><strong>{site_l}:</strong> {name}</p>",
                "<p><strong>URL:</strong> <a href=\"{href}\" style=\"color: #007bff;\">{url}</a></p>",
                "<p><strong>{change_l}:</strong> {label}</p>",
                "<p><strong>{at_l}:</strong> {timestamp}</p>",
                "</div>",
                "<p style=\"color: #666; font-size: 14px;\">{body}</p>",
                "<p style=\"color: #999; font-size: 12px;\">{footer}</p>",
                "</div>"
            ),
            heading = s.heading,
            site_l = s.site,
            name = escape_html(&site.name),
            href = escape_attr(&site.url),
            url = escape_html(&site.url),
            change_l = s.change,
            label = label,
            at_l = s.detected_at,
            timestamp = timestamp,
            body = s.body,
            footer = s.footer,
        );

        NotificationMessage {
            site_id: site.id,
            site_name: site.name.clone(),
            url: site.url.clone(),
            kind: change.kind,
            detected_at_ms,
            subject: self.subject.clone(),
            text,
            html,
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}
