//! Page retrieval with an ordered fallback chain.
//!
//! [`FetchEngine`] runs [`FetchStrategy`] implementations cheapest first
//! (direct HTTP, streamed HTTP, headless browser) and stops at the first one
//! that reaches the page.

mod client;
pub mod direct;
pub mod engine;
pub mod error;
pub mod rendered;
pub mod strategy;
pub mod streaming;
pub mod types;

pub use {
    direct::DirectHttpStrategy,
    engine::FetchEngine,
    error::{FetchError, Result},
    rendered::RenderedBrowserStrategy,
    strategy::FetchStrategy,
    streaming::AsyncHttpStrategy,
    types::{FailedAttempt, FetchedPage, ScrapeResult},
};
