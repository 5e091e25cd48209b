//! chromiumoxide implementation of the expansion page driver
//!
//! All document inspection happens inside single JS evaluations so one CDP
//! round trip yields one decision. The control snapshot stamps each button
//! and link with a synthetic index attribute; clicks address elements by
//! that index instead of re-querying selectors.

use chromiumoxide::Page;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{ImdbError, Result};
use crate::render::expand::{Control, ControlTag, PageDriver};
use crate::render::RenderConfig;

/// Attribute stamped onto scanned controls so clicks can find them again.
const SCAN_INDEX_ATTR: &str = "data-scrape-index";

/// A live season page plus the timeouts that bound every wait on it.
pub(crate) struct CdpPage<'a> {
    page: &'a Page,
    config: &'a RenderConfig,
}

impl<'a> CdpPage<'a> {
    pub(crate) fn new(page: &'a Page, config: &'a RenderConfig) -> Self {
        Self { page, config }
    }

    /// Evaluate a JS expression and deserialize its resolved value.
    async fn eval<T>(&self, js: String) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| ImdbError::Browser(format!("page evaluation failed: {e}")))?;
        value
            .into_value::<T>()
            .map_err(|e| ImdbError::Browser(format!("unexpected evaluation result: {e}")))
    }
}

/// Control snapshot entry as the in-page script reports it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawControl {
    index: u32,
    tag: String,
    text: String,
    href: Option<String>,
    aria_label: Option<String>,
    aria_disabled: Option<String>,
    disabled: bool,
    testid: Option<String>,
    visible: bool,
}

fn control_from_raw(raw: RawControl) -> Control {
    Control {
        index: raw.index,
        tag: if raw.tag.eq_ignore_ascii_case("button") {
            ControlTag::Button
        } else {
            ControlTag::Link
        },
        text: raw.text,
        href: raw.href,
        aria_label: raw.aria_label,
        aria_disabled: raw.aria_disabled,
        disabled: raw.disabled,
        testid: raw.testid,
        visible: raw.visible,
    }
}

fn scan_script() -> String {
    format!(
        r#"(() => {{
            const out = [];
            let index = 0;
            for (const el of document.querySelectorAll('button, a')) {{
                el.setAttribute('{attr}', String(index));
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                const visible = rect.width > 0 && rect.height > 0
                    && style.visibility !== 'hidden' && style.display !== 'none';
                const testids = [];
                let node = el;
                while (node && node.getAttribute) {{
                    const t = node.getAttribute('data-testid');
                    if (t) testids.push(t);
                    node = node.parentElement;
                }}
                out.push({{
                    index: index,
                    tag: el.tagName === 'BUTTON' ? 'button' : 'a',
                    text: (el.innerText || '').trim().slice(0, 160),
                    href: el.getAttribute('href'),
                    ariaLabel: el.getAttribute('aria-label'),
                    ariaDisabled: el.getAttribute('aria-disabled'),
                    disabled: !!el.disabled,
                    testid: testids.length ? testids.join(' ') : null,
                    visible: visible,
                }});
                index += 1;
            }}
            return out;
        }})()"#,
        attr = SCAN_INDEX_ATTR
    )
}

impl PageDriver for CdpPage<'_> {
    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ImdbError::Browser(format!("reading page url failed: {e}")))?;
        Ok(url.unwrap_or_default())
    }

    async fn card_count(&self) -> Result<usize> {
        self.eval("document.querySelectorAll('article').length".to_string())
            .await
    }

    async fn scan_controls(&self) -> Result<Vec<Control>> {
        let raw: Vec<RawControl> = self.eval(scan_script()).await?;
        Ok(raw.into_iter().map(control_from_raw).collect())
    }

    async fn click(&self, control: &Control) -> Result<()> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('[{attr}="{index}"]');
                if (!el) return false;
                el.scrollIntoView({{ block: 'center' }});
                el.click();
                return true;
            }})()"#,
            attr = SCAN_INDEX_ATTR,
            index = control.index
        );
        let clicked: bool = self.eval(js).await?;
        if !clicked {
            return Err(ImdbError::Browser(format!(
                "control {} vanished before it could be clicked",
                control.index
            )));
        }
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let nav = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        };
        timeout(self.config.nav_timeout(), nav)
            .await
            .map_err(|_| ImdbError::Browser(format!("navigation to {url} timed out")))?
            .map_err(|e| ImdbError::Browser(format!("navigation to {url} failed: {e}")))
    }

    async fn wait_for_cards(&self) -> Result<()> {
        let wait_ms = self.config.card_timeout().as_millis();
        let js = format!(
            r#"(async () => {{
                const deadline = Date.now() + {wait_ms};
                while (Date.now() < deadline) {{
                    if (document.querySelectorAll('article').length > 0) return true;
                    await new Promise(r => setTimeout(r, 250));
                }}
                return false;
            }})()"#
        );
        let appeared: bool = self.eval(js).await?;
        if !appeared {
            return Err(ImdbError::Browser(format!(
                "no episode cards after {}s",
                self.config.card_timeout_secs
            )));
        }
        Ok(())
    }

    async fn wait_for_growth(&self, before: usize) -> Result<bool> {
        let wait_ms = self.config.growth_timeout().as_millis();
        let js = format!(
            r#"(async () => {{
                const deadline = Date.now() + {wait_ms};
                while (Date.now() < deadline) {{
                    if (document.querySelectorAll('article').length > {before}) return true;
                    await new Promise(r => setTimeout(r, 250));
                }}
                return false;
            }})()"#
        );
        self.eval(js).await
    }

    async fn wait_for_network_idle(&self) -> Result<()> {
        let wait_ms = self.config.idle_timeout().as_millis();
        let js = format!(
            r#"(async () => {{
                const timeoutMs = {wait_ms};
                const idleMs = 1000;
                const interval = 250;
                const start = Date.now();
                let lastCount = 0;
                let stableMs = 0;
                try {{ lastCount = performance.getEntriesByType('resource').length; }} catch (_) {{}}
                while (Date.now() - start < timeoutMs) {{
                    await new Promise(r => setTimeout(r, interval));
                    let curCount = lastCount;
                    try {{ curCount = performance.getEntriesByType('resource').length; }} catch (_) {{}}
                    if (document.readyState === 'complete' && curCount === lastCount) {{
                        stableMs += interval;
                        if (stableMs >= idleMs) {{
                            return {{ ok: true, resourceCount: curCount, waitedMs: Date.now() - start }};
                        }}
                    }} else {{
                        stableMs = 0;
                    }}
                    lastCount = curCount;
                }}
                return {{ ok: false, resourceCount: lastCount, waitedMs: Date.now() - start }};
            }})()"#
        );
        let info: serde_json::Value = self.eval(js).await?;
        let ok = info.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
        let waited = info.get("waitedMs").and_then(|v| v.as_u64()).unwrap_or(0);
        if ok {
            debug!("network settled after {}ms", waited);
        } else {
            debug!("network never settled within {}ms", waited);
        }
        Ok(())
    }
}
