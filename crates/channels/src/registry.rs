use sitewatch_common::ChannelKind;

use crate::channel::NotificationChannel;

/// Configured channels, in delivery order.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel, replacing any existing channel of the same kind.
    pub fn register(&mut self, channel: Box<dyn NotificationChannel>) {
        let kind = channel.kind();
        match self.channels.iter().position(|c| c.kind() == kind) {
            Some(idx) => self.channels[idx] = channel,
            None => self.channels.push(channel),
        }
    }

    pub fn get(&self, kind: ChannelKind) -> Option<&dyn NotificationChannel> {
        self.channels
            .iter()
            .find(|c| c.kind() == kind)
            .map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn NotificationChannel> {
        self.channels.iter().map(|c| c.as_ref())
    }

    pub fn list(&self) -> Vec<ChannelKind> {
        self.channels.iter().map(|c| c.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
