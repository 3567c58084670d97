//! A single lazily launched headless browser, reused across renders.

use std::time::Duration;

use {
    chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Page, handler::viewport::Viewport},
    futures::StreamExt,
    tokio::{sync::Mutex, task::JoinHandle, time::Instant},
    tracing::{debug, info, warn},
};

use crate::{
    detect::detect_browser,
    error::BrowserError,
    types::{BrowserConfig, RenderWaits},
};

const BODY_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct LiveBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

#[derive(Default)]
struct SessionState {
    live: Option<LiveBrowser>,
    closed: bool,
}

/// Owns at most one Chromium process. The browser is launched on the first
/// render and kept until [`RenderSession::shutdown`].
pub struct RenderSession {
    config: BrowserConfig,
    state: Mutex<SessionState>,
}

impl RenderSession {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Whether a browser process is currently attached.
    pub async fn is_running(&self) -> bool {
        self.state.lock().await.live.is_some()
    }

    /// Navigate to `url`, wait for `<body>`, let scripts settle, and return
    /// the page's rendered text.
    pub async fn render_text(&self, url: &str, waits: RenderWaits) -> Result<String, BrowserError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(BrowserError::ShutDown);
        }
        if state
            .live
            .as_ref()
            .is_some_and(|live| live.handler.is_finished())
        {
            warn!("browser connection lost, relaunching");
            state.live = None;
        }

        let live = match state.live.take() {
            Some(live) => live,
            None => self.launch().await?,
        };
        let live = state.live.insert(live);

        let page = live
            .browser
            .new_page(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(format!("{url}: {e}")))?;

        // The caller's timeout may drop this future mid-render; the guard
        // still closes the tab then.
        let guard = PageGuard::new(page.clone());
        let result = read_body_text(&page, waits).await;
        guard.disarm();

        if let Err(e) = page.close().await {
            debug!(url, error = %e, "failed to close page");
        }
        result
    }

    /// Close the browser if one was launched. Later renders fail with
    /// [`BrowserError::ShutDown`].
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        let Some(mut live) = state.live.take() else {
            return;
        };
        if let Err(e) = live.browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = live.browser.wait().await {
            debug!(error = %e, "failed to reap browser process");
        }
        live.handler.abort();
        info!("render session shut down");
    }

    async fn launch(&self) -> Result<LiveBrowser, BrowserError> {
        let detection = detect_browser(self.config.chrome_path.as_deref());
        let Some(path) = detection.path else {
            return Err(BrowserError::BrowserNotAvailable(detection.install_hint));
        };

        let mut builder = CdpBrowserConfig::builder();

        // chromiumoxide is headless unless asked otherwise.
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .viewport(Viewport {
                width: self.config.viewport_width,
                height: self.config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(self.config.request_timeout)
            .chrome_executable(&path);

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }
        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");

        let config = builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler error");
                }
            }
            debug!("browser event handler exited");
        });

        info!(
            path = %path.display(),
            headless = self.config.headless,
            "launched browser"
        );
        Ok(LiveBrowser { browser, handler })
    }
}

// ── Page cleanup ────────────────────────────────────────────────────────────

/// A tab that can be closed from a synchronous context such as `Drop`.
trait CloseDetached: Send + 'static {
    fn close_detached(self);
}

impl CloseDetached for Page {
    fn close_detached(self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = self.close().await {
                        debug!(error = %e, "failed to close abandoned page");
                    }
                });
            },
            Err(_) => warn!("no runtime left to close abandoned page"),
        }
    }
}

/// Closes its page handle on drop unless [`PageGuard::disarm`] ran first.
struct PageGuard<P: CloseDetached> {
    page: Option<P>,
}

impl<P: CloseDetached> PageGuard<P> {
    fn new(page: P) -> Self {
        Self { page: Some(page) }
    }

    /// The render finished; the caller closes the page itself.
    fn disarm(mut self) {
        self.page = None;
    }
}

impl<P: CloseDetached> Drop for PageGuard<P> {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            debug!("render abandoned, closing page in background");
            page.close_detached();
        }
    }
}

async fn read_body_text(page: &Page, waits: RenderWaits) -> Result<String, BrowserError> {
    let deadline = Instant::now() + waits.dom_ready;
    loop {
        let ready: bool = page
            .evaluate("document.body !== null")
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?
            .into_value()
            .unwrap_or(false);
        if ready {
            break;
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout(format!(
                "<body> not present after {}ms",
                waits.dom_ready.as_millis()
            )));
        }
        tokio::time::sleep(BODY_POLL_INTERVAL).await;
    }

    tokio::time::sleep(waits.settle).await;

    page.evaluate("document.body ? document.body.innerText : ''")
        .await
        .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?
        .into_value::<String>()
        .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    /// Counts how often it was closed in the background.
    struct Tab(Arc<AtomicUsize>);

    impl CloseDetached for Tab {
        fn close_detached(self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn timed_out_render_still_closes_page() {
        let closes = Arc::new(AtomicUsize::new(0));
        let guard = PageGuard::new(Tab(closes.clone()));
        let render = async move {
            std::future::pending::<()>().await;
            guard.disarm();
        };

        let outcome = tokio::time::timeout(Duration::from_millis(20), render).await;
        assert!(outcome.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disarmed_guard_leaves_closing_to_caller() {
        let closes = Arc::new(AtomicUsize::new(0));
        PageGuard::new(Tab(closes.clone())).disarm();
        assert_eq!(closes.load(Ordering::SeqCst), 0);

        drop(PageGuard::new(Tab(closes.clone())));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_without_launch_is_noop() {
        let session = RenderSession::new(BrowserConfig::default());
        assert!(!session.is_running().await);
        session.shutdown().await;
        assert!(!session.is_running().await);
    }

    #[tokio::test]
    async fn render_after_shutdown_fails_fast() {
        let session = RenderSession::new(BrowserConfig::default());
        session.shutdown().await;
        let err = session
            .render_text("https://example.com", RenderWaits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::ShutDown));
    }
}
