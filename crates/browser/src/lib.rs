//! Headless Chromium over CDP for pages that only produce content after
//! client-side rendering.
//!
//! A [`RenderSession`] launches the browser on first use and keeps it until
//! [`RenderSession::shutdown`]. [`detect::detect_browser`] reports whether a
//! usable binary is installed.

pub mod detect;
pub mod error;
pub mod session;
pub mod types;

pub use {
    error::BrowserError,
    session::RenderSession,
    types::{BrowserConfig, RenderWaits},
};
