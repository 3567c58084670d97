use {async_trait::async_trait, sitewatch_common::ChannelKind};

use crate::{Result, message::NotificationMessage};

/// One way of delivering a change notification.
///
/// Failures are returned to the dispatcher, which logs and records them; they
/// never abort delivery to other channels or subscribers.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Deliver `message` to `destination` (an email address, a LINE user id).
    async fn send(&self, destination: &str, message: &NotificationMessage) -> Result<()>;
}
