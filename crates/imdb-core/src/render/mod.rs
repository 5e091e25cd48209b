//! Headless-browser rendering of season pages
//!
//! Episode lists only exist after JavaScript runs and the "load more"
//! controls have been clicked through, so season pages are rendered in a
//! real Chromium driven over CDP. One browser process serves a whole
//! [`RenderPool::render_seasons`] call; each render attempt runs in its own
//! isolated browser context and failures degrade to an absent page instead
//! of an error.

mod expand;
mod page;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetBlockedUrLsParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::future::join_all;
use futures::StreamExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::client::{DEFAULT_USER_AGENT, IMDB_BASE_URL};
use crate::error::{ImdbError, Result};
use crate::render::expand::{expand_page, PageDriver};
use crate::render::page::CdpPage;

/// URL patterns blocked on every rendered page. Fonts and trackers add
/// seconds of load time without changing the episode list.
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.otf",
    "*doubleclick*",
    "*google-analytics*",
];

/// Consecutive CDP handler errors after which the browser is assumed gone.
const MAX_HANDLER_ERRORS: u32 = 10;

/// Configuration for the render pool
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Maximum concurrently rendering pages (default: 4)
    pub pool_size: usize,
    /// Navigation budget per page load in seconds (default: 30)
    pub nav_timeout_secs: u64,
    /// Wait for the first episode card in seconds (default: 15)
    pub card_timeout_secs: u64,
    /// Wait for card-count growth after a click in seconds (default: 12)
    pub growth_timeout_secs: u64,
    /// Network-idle fallback bound in seconds (default: 8)
    pub idle_timeout_secs: u64,
    /// Pause after each click in milliseconds (default: 400)
    pub click_settle_ms: u64,
    /// Pause before each rescan in milliseconds (default: 300)
    pub rescan_settle_ms: u64,
    /// Render attempts per season (default: 3)
    pub max_attempts: u32,
    /// Linear backoff base in milliseconds, waits `backoff_ms * attempt`
    /// between attempts (default: 2000)
    pub backoff_ms: u64,
    /// Explicit Chromium executable; `None` relies on auto-detection
    pub chrome_executable: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            nav_timeout_secs: 30,
            card_timeout_secs: 15,
            growth_timeout_secs: 12,
            idle_timeout_secs: 8,
            click_settle_ms: 400,
            rescan_settle_ms: 300,
            max_attempts: 3,
            backoff_ms: 2000,
            chrome_executable: None,
        }
    }
}

impl RenderConfig {
    pub(crate) fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }

    pub(crate) fn card_timeout(&self) -> Duration {
        Duration::from_secs(self.card_timeout_secs)
    }

    pub(crate) fn growth_timeout(&self) -> Duration {
        Duration::from_secs(self.growth_timeout_secs)
    }

    pub(crate) fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    fn rescan_settle(&self) -> Duration {
        Duration::from_millis(self.rescan_settle_ms)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms * u64::from(attempt))
    }
}

/// Outcome of rendering one season page
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Season the page was rendered for
    pub season: u32,
    /// Fully expanded page HTML, `None` when every attempt failed
    pub html: Option<String>,
}

/// Bounded pool of headless-browser sessions
///
/// Launches one Chromium process per [`render_seasons`] call and fans the
/// requested seasons out over it, at most `pool_size` pages at a time.
///
/// [`render_seasons`]: RenderPool::render_seasons
pub struct RenderPool {
    config: RenderConfig,
}

impl RenderPool {
    /// Create a pool with the given configuration
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the episode list page for each requested season
    ///
    /// Results come back in the order of `seasons`. A season whose render
    /// attempts all failed carries `html: None`; only a browser that cannot
    /// be launched at all is an error.
    ///
    /// # Arguments
    /// * `title_id` - IMDb title ID, e.g. `tt7441658`
    /// * `seasons` - Season numbers to render
    pub async fn render_seasons(
        &self,
        title_id: &str,
        seasons: &[u32],
    ) -> Result<Vec<RenderResult>> {
        if seasons.is_empty() {
            return Ok(Vec::new());
        }

        let (browser, handler_task) = self.launch().await?;
        info!("rendering {} season page(s) for {}", seasons.len(), title_id);

        let semaphore = Arc::new(Semaphore::new(self.config.pool_size.max(1)));
        let jobs = seasons.iter().map(|&season| {
            let semaphore = Arc::clone(&semaphore);
            let browser = &browser;
            let config = &self.config;
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return RenderResult { season, html: None },
                };
                render_season(browser, config, title_id, season).await
            }
        });
        let results = join_all(jobs).await;

        shutdown(browser, handler_task).await;
        Ok(results)
    }

    /// Launch Chromium and start draining its CDP event stream
    async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
        let mut builder = BrowserConfig::builder()
            .window_size(1280, 900)
            .request_timeout(Duration::from_secs(45))
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ImdbError::Browser(format!("no usable Chromium: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ImdbError::Browser(format!("launching Chromium failed: {e}")))?;

        // The event stream must be drained for the browser to make progress.
        let handler_task = tokio::spawn(async move {
            let mut errors = 0u32;
            while let Some(event) = handler.next().await {
                match event {
                    Ok(_) => errors = 0,
                    Err(e) => {
                        errors += 1;
                        debug!(
                            "browser handler error {}/{}: {}",
                            errors, MAX_HANDLER_ERRORS, e
                        );
                        if errors >= MAX_HANDLER_ERRORS {
                            warn!("browser handler keeps failing, assuming the browser is gone");
                            break;
                        }
                    }
                }
            }
        });

        Ok((browser, handler_task))
    }
}

/// Episode list URL for one season
fn season_url(title_id: &str, season: u32) -> String {
    format!("{IMDB_BASE_URL}/title/{title_id}/episodes/?season={season}")
}

/// Render one season with retries; exhaustion yields an absent page
async fn render_season(
    browser: &Browser,
    config: &RenderConfig,
    title_id: &str,
    season: u32,
) -> RenderResult {
    let url = season_url(title_id, season);

    for attempt in 1..=config.max_attempts {
        match render_once(browser, config, &url).await {
            Ok(html) => {
                debug!("season {} rendered ({} bytes)", season, html.len());
                return RenderResult {
                    season,
                    html: Some(html),
                };
            }
            Err(e) => {
                warn!(
                    "render attempt {}/{} for season {} failed: {}",
                    attempt, config.max_attempts, season, e
                );
                if attempt < config.max_attempts {
                    sleep(config.backoff_delay(attempt)).await;
                }
            }
        }
    }

    warn!("season {} never rendered, skipping it", season);
    RenderResult { season, html: None }
}

/// One render attempt inside a fresh isolated browser context
async fn render_once(browser: &Browser, config: &RenderConfig, url: &str) -> Result<String> {
    let context_id = browser
        .execute(CreateBrowserContextParams::default())
        .await
        .map_err(|e| ImdbError::Browser(format!("creating a browser context failed: {e}")))?
        .result
        .browser_context_id;

    let result = render_in_context(browser, config, url, context_id.clone()).await;

    // The context is disposed on failure paths too.
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        debug!("disposing browser context failed: {}", e);
    }

    result
}

async fn render_in_context(
    browser: &Browser,
    config: &RenderConfig,
    url: &str,
    context_id: BrowserContextId,
) -> Result<String> {
    let params = CreateTargetParams::builder()
        .url("about:blank")
        .browser_context_id(context_id)
        .build()
        .map_err(ImdbError::Browser)?;
    let page = browser
        .new_page(params)
        .await
        .map_err(|e| ImdbError::Browser(format!("opening a page failed: {e}")))?;

    let result = expand_season_page(&page, config, url).await;

    if let Err(e) = page.close().await {
        debug!("closing page failed: {}", e);
    }

    result
}

/// Prepare a page, load the season URL, run the expansion, capture HTML
async fn expand_season_page(page: &Page, config: &RenderConfig, url: &str) -> Result<String> {
    page.set_user_agent(DEFAULT_USER_AGENT)
        .await
        .map_err(|e| ImdbError::Browser(format!("setting the user agent failed: {e}")))?;

    let headers = Headers::new(serde_json::json!({ "Accept-Language": "en-US,en;q=0.9" }));
    if let Err(e) = page.execute(SetExtraHttpHeadersParams::new(headers)).await {
        debug!("setting extra headers failed: {}", e);
    }
    let blocked = SetBlockedUrLsParams {
        urls: BLOCKED_URL_PATTERNS.iter().map(|s| s.to_string()).collect(),
    };
    if let Err(e) = page.execute(blocked).await {
        debug!("setting the URL blocklist failed: {}", e);
    }

    let driver = CdpPage::new(page, config);
    driver.navigate(url).await?;
    driver.wait_for_cards().await?;

    let outcome = expand_page(&driver, config.click_settle(), config.rescan_settle()).await?;
    debug!(
        "expansion finished: {} clicks, {} cards, aborted={}",
        outcome.clicks, outcome.cards, outcome.aborted
    );

    page.content()
        .await
        .map_err(|e| ImdbError::Browser(format!("capturing page content failed: {e}")))
}

/// Close the browser, reap its process, and stop the event drain
async fn shutdown(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        debug!("closing the browser failed: {}", e);
    }
    if let Err(e) = browser.wait().await {
        debug!("waiting for the browser process failed: {}", e);
    }
    if timeout(Duration::from_secs(2), handler_task).await.is_err() {
        debug!("browser handler did not stop in time");
    }
}
