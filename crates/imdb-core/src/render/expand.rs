//! Load-more expansion state machine
//!
//! IMDb season pages hide most episodes behind one or more "load more"
//! controls. This module finds those controls without relying on CSS
//! classes and clicks through them until the list stops growing.
//!
//! The machine runs against a [`PageDriver`] rather than a concrete
//! browser page, so every transition can be exercised with a scripted
//! fake. The chromiumoxide driver lives in [`super::page`].

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;

/// Tag of a clickable control in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlTag {
    Button,
    Link,
}

/// One clickable control harvested from the live page.
///
/// The snapshot is taken in a single JS evaluation; `index` is a synthetic
/// attribute stamped onto the element so a later click can address it
/// without re-querying.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Control {
    /// Synthetic index used to click the element later
    pub(crate) index: u32,
    /// Element kind (button or anchor)
    pub(crate) tag: ControlTag,
    /// Trimmed inner text
    pub(crate) text: String,
    /// `href` attribute, links only
    pub(crate) href: Option<String>,
    /// `aria-label` attribute
    pub(crate) aria_label: Option<String>,
    /// `aria-disabled` attribute, verbatim
    pub(crate) aria_disabled: Option<String>,
    /// Disabled flag of form controls
    pub(crate) disabled: bool,
    /// Space-joined `data-testid` values of the element and its ancestors
    pub(crate) testid: Option<String>,
    /// Whether the element is rendered and visible
    pub(crate) visible: bool,
}

impl Control {
    fn aria_disabled(&self) -> bool {
        self.aria_disabled.as_deref() == Some("true")
    }

    fn testid_contains(&self, fragment: &str) -> bool {
        self.testid
            .as_deref()
            .is_some_and(|t| t.contains(fragment))
    }

    fn label_mentions_more(&self) -> bool {
        self.aria_label.as_deref().is_some_and(|label| {
            let label = label.to_lowercase();
            label.contains("more") || label.contains("see all")
        })
    }

    /// Links that would leave the episode list are never candidates.
    fn passes_nav_guard(&self) -> bool {
        self.tag == ControlTag::Button || !is_navigating_href(self.href.as_deref())
    }
}

/// Decide whether an href would navigate away when clicked.
///
/// An href counts as navigating unless it is absent, empty, whitespace-only,
/// a fragment (`#...`), or a `javascript:` pseudo-URL.
pub(crate) fn is_navigating_href(href: Option<&str>) -> bool {
    let Some(href) = href else {
        return false;
    };
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    if href.to_lowercase().starts_with("javascript:") {
        return false;
    }
    true
}

/// Text shapes a load-more control announces itself with ("24 more",
/// "See all", "Load more").
fn matches_expand_text(text: &str) -> bool {
    regex_lite::Regex::new(r"(?i)\d+\s+more|see\s+all|load\s+more")
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Pick the load-more control to click next, if any.
///
/// Four strategies in fixed order, first hit wins:
/// 1. visible, enabled button with load-more text;
/// 2. visible in-page link with load-more text;
/// 3. `data-testid` markers (`see-more`, `load-more`, `expand`), buttons
///    before links per marker;
/// 4. `aria-label` mentioning "more" or "see all", buttons before links.
pub(crate) fn select_load_more(controls: &[Control]) -> Option<&Control> {
    if let Some(control) = controls.iter().find(|c| {
        c.tag == ControlTag::Button && c.visible && !c.disabled && matches_expand_text(&c.text)
    }) {
        return Some(control);
    }

    if let Some(control) = controls.iter().find(|c| {
        c.tag == ControlTag::Link
            && c.visible
            && c.passes_nav_guard()
            && !c.aria_disabled()
            && matches_expand_text(&c.text)
    }) {
        return Some(control);
    }

    for fragment in ["see-more", "load-more", "expand"] {
        for tag in [ControlTag::Button, ControlTag::Link] {
            if let Some(control) = controls.iter().find(|c| {
                c.tag == tag
                    && c.visible
                    && c.testid_contains(fragment)
                    && c.passes_nav_guard()
                    && !c.aria_disabled()
            }) {
                return Some(control);
            }
        }
    }

    for tag in [ControlTag::Button, ControlTag::Link] {
        if let Some(control) = controls.iter().find(|c| {
            c.tag == tag
                && c.visible
                && c.label_mentions_more()
                && c.passes_nav_guard()
                && !c.aria_disabled()
        }) {
            return Some(control);
        }
    }

    None
}

/// Browser-page operations the expansion machine needs.
///
/// The chromiumoxide implementation drives a real CDP page; tests drive a
/// scripted fake. Waits are bounded by the implementation, never by the
/// machine.
pub(crate) trait PageDriver {
    /// Current page URL.
    async fn current_url(&self) -> Result<String>;

    /// Number of episode cards currently in the document.
    async fn card_count(&self) -> Result<usize>;

    /// Snapshot every button and link on the page.
    async fn scan_controls(&self) -> Result<Vec<Control>>;

    /// Scroll the control into view and click it.
    async fn click(&self, control: &Control) -> Result<()>;

    /// Navigate to `url` and wait for the document to load.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Wait until at least one episode card exists.
    async fn wait_for_cards(&self) -> Result<()>;

    /// Wait until the card count exceeds `before`. `Ok(false)` means the
    /// bounded wait elapsed without growth.
    async fn wait_for_growth(&self, before: usize) -> Result<bool>;

    /// Bounded network-idle heuristic, used when growth never shows up.
    async fn wait_for_network_idle(&self) -> Result<()>;
}

/// Phase of the expansion machine.
///
/// ```text
/// Scanning -> (candidate found)   -> Clicking
/// Scanning -> (no candidate)      -> Done
/// Clicking -> Waiting
/// Waiting  -> (url drifted)       -> Aborted
/// Waiting  -> (growth or timeout) -> Scanning
/// ```
#[derive(Debug, Clone, PartialEq)]
enum ExpandState {
    Scanning,
    Clicking(Control),
    Waiting { origin: String, before: usize },
    Aborted,
    Done,
}

/// What an expansion run did to the page.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExpandOutcome {
    /// Load-more clicks performed
    pub(crate) clicks: u32,
    /// Card count at the last scan
    pub(crate) cards: usize,
    /// A click navigated away and the run stopped early
    pub(crate) aborted: bool,
}

/// Click through every load-more control until the list stops growing.
///
/// Click, scroll, and wait failures end the run gracefully with whatever
/// content the page accumulated; snapshot failures propagate so the render
/// attempt can retry on a fresh page. An aborted run (a control that
/// navigated away) also keeps the accumulated content.
///
/// # Arguments
/// * `driver` - Page operations
/// * `click_settle` - Pause after each click before checking the URL
/// * `rescan_settle` - Pause after each wait before rescanning
pub(crate) async fn expand_page<D: PageDriver>(
    driver: &D,
    click_settle: Duration,
    rescan_settle: Duration,
) -> Result<ExpandOutcome> {
    let mut outcome = ExpandOutcome::default();
    let mut state = ExpandState::Scanning;

    loop {
        state = match state {
            ExpandState::Scanning => {
                outcome.cards = driver.card_count().await?;
                let controls = driver.scan_controls().await?;
                match select_load_more(&controls) {
                    Some(control) => {
                        debug!(
                            "load-more candidate {:?} \"{}\" with {} cards visible",
                            control.tag, control.text, outcome.cards
                        );
                        ExpandState::Clicking(control.clone())
                    }
                    None => ExpandState::Done,
                }
            }
            ExpandState::Clicking(control) => {
                click_step(driver, &control, &mut outcome, click_settle).await
            }
            ExpandState::Waiting { origin, before } => {
                wait_step(driver, &origin, before, rescan_settle).await
            }
            ExpandState::Aborted => {
                outcome.aborted = true;
                warn!(
                    "expansion aborted after {} clicks: a control navigated away",
                    outcome.clicks
                );
                break;
            }
            ExpandState::Done => break,
        };
    }

    Ok(outcome)
}

async fn click_step<D: PageDriver>(
    driver: &D,
    control: &Control,
    outcome: &mut ExpandOutcome,
    settle: Duration,
) -> ExpandState {
    let origin = match driver.current_url().await {
        Ok(url) => url,
        Err(e) => {
            debug!("reading the page url failed, stopping expansion: {}", e);
            return ExpandState::Done;
        }
    };

    if let Err(e) = driver.click(control).await {
        debug!("load-more click failed, stopping expansion: {}", e);
        return ExpandState::Done;
    }
    outcome.clicks += 1;
    sleep(settle).await;

    ExpandState::Waiting {
        origin,
        before: outcome.cards,
    }
}

async fn wait_step<D: PageDriver>(
    driver: &D,
    origin: &str,
    before: usize,
    settle: Duration,
) -> ExpandState {
    let here = match driver.current_url().await {
        Ok(url) => url,
        Err(e) => {
            debug!("reading the page url failed, stopping expansion: {}", e);
            return ExpandState::Done;
        }
    };

    if here != origin {
        debug!("click navigated to {}, returning to {}", here, origin);
        if let Err(e) = driver.navigate(origin).await {
            debug!("re-navigation failed: {}", e);
        } else if let Err(e) = driver.wait_for_cards().await {
            debug!("episode cards did not reappear: {}", e);
        }
        return ExpandState::Aborted;
    }

    match driver.wait_for_growth(before).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(
                "card count stuck at {}, falling back to network idle",
                before
            );
            if let Err(e) = driver.wait_for_network_idle().await {
                debug!("network idle wait failed, stopping expansion: {}", e);
                return ExpandState::Done;
            }
        }
        Err(e) => {
            debug!("growth wait failed, stopping expansion: {}", e);
            return ExpandState::Done;
        }
    }
    sleep(settle).await;

    ExpandState::Scanning
}
