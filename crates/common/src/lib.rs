//! Typed records, error definitions, and small helpers shared by every
//! sitewatch crate.

pub mod error;
pub mod time;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    time::now_ms,
    types::{
        ChangeAspect, ChangeEvent, ChangeKind, ChangeResult, ChangeSeverity, ChannelKind,
        CheckRecord, Fingerprint, Locale, NotificationRecord, NotificationStatus, Site, SiteId,
        StrategyKind, Subscriber, SubscriberId, validate_url,
    },
};
