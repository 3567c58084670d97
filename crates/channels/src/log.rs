use {async_trait::async_trait, sitewatch_common::ChannelKind, tracing::info};

use crate::{Result, channel::NotificationChannel, message::NotificationMessage};

/// Writes notifications to the log instead of delivering them. Used for dry
/// runs; always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Log
    }

    async fn send(&self, destination: &str, message: &NotificationMessage) -> Result<()> {
        info!(
            destination,
            site_id = message.site_id,
            site = %message.site_name,
            change = %message.kind,
            subject = %message.subject,
            "notification (log channel)"
        );
        Ok(())
    }
}
