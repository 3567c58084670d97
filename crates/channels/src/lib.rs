//! Change notifications.
//!
//! A [`NotificationDispatcher`] renders one [`NotificationMessage`] per site
//! change and sends it to each subscriber through every registered
//! [`NotificationChannel`] the subscriber has enabled: Gmail, LINE, or the
//! log channel used for dry runs.

pub mod channel;
pub mod dispatcher;
pub mod email;
pub mod error;
pub mod line;
pub mod log;
pub mod message;
pub mod registry;

pub use {
    channel::NotificationChannel,
    dispatcher::{DispatchReport, NotificationDispatcher, UserDispatch},
    email::GmailChannel,
    error::{Error, Result},
    line::LineChannel,
    log::LogChannel,
    message::{MessageBuilder, NotificationMessage},
    registry::ChannelRegistry,
};
