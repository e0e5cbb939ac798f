//! Chrome session management and the CDP-backed page surface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dom::DomSurface;
use crate::error::CrawlError;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Interval between condition re-checks in bounded waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub headless: bool,
    /// DevTools endpoint of an already-running Chrome. When set, no local
    /// browser is launched.
    pub remote_url: Option<String>,
    pub chrome_args: Vec<String>,
}

/// One Chrome instance, launched locally or attached over DevTools.
pub struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl Session {
    pub async fn start(config: &SessionConfig) -> Result<Self, CrawlError> {
        let (browser, mut handler) = if let Some(remote) = &config.remote_url {
            info!(url = %remote, "connecting to remote browser");
            let ws_url = resolve_debugger_url(remote).await?;
            Browser::connect(ws_url).await?
        } else {
            info!(headless = config.headless, "launching browser");
            let mut builder = BrowserConfig::builder();
            if !config.headless {
                builder = builder.with_head();
            }
            builder = builder
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-infobars")
                .arg("--disable-dev-shm-usage")
                .arg("--no-first-run")
                .arg("--no-default-browser-check")
                .arg("--disable-background-networking")
                .arg("--no-sandbox")
                .arg("--disable-gpu");
            for arg in &config.chrome_args {
                builder = builder.arg(arg);
            }
            let browser_config = builder
                .build()
                .map_err(|e| CrawlError::Config(format!("browser config: {e}")))?;
            Browser::launch(browser_config).await?
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    /// Open a new page at `url` and wrap it as a [`DomSurface`].
    pub async fn open(&self, url: &str) -> Result<Arc<dyn DomSurface>, CrawlError> {
        let page = self.browser.new_page("about:blank").await?;
        page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
            .await?;
        page.goto(url).await?;
        tokio::time::timeout(NAVIGATION_TIMEOUT, page.wait_for_navigation())
            .await
            .map_err(|_| CrawlError::Timeout(format!("navigation to {url}")))??;
        Ok(Arc::new(CdpSurface { page }))
    }

    pub async fn close(mut self) -> Result<(), CrawlError> {
        self.browser.close().await?;
        self.handler_task.abort();
        Ok(())
    }
}

/// Resolve a DevTools base URL to its WebSocket debugger endpoint via the
/// `/json/version` metadata route.
async fn resolve_debugger_url(url: &str) -> Result<String, CrawlError> {
    let http_url = url.replace("ws://", "http://").replace("wss://", "https://");
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let resp: serde_json::Value = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .map_err(|e| CrawlError::Config(format!("remote browser unreachable: {e}")))?
        .json()
        .await
        .map_err(|e| CrawlError::Config(format!("invalid /json/version response: {e}")))?;

    resp.get("webSocketDebuggerUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| CrawlError::Config("no webSocketDebuggerUrl in response".to_string()))
}

/// [`DomSurface`] over one live CDP page.
///
/// Reads go through in-page JavaScript so that scoped queries, missing
/// attributes, and detached elements all degrade to empty results instead of
/// aborting a round. Interaction primitives use the element API and surface
/// automation failures.
struct CdpSurface {
    page: Page,
}

impl CdpSurface {
    /// Evaluate `expr` and decode its JSON result, degrading any evaluation
    /// or decode failure to the type's default.
    async fn eval_or_default<T: DeserializeOwned + Default>(&self, expr: String) -> T {
        match self.page.evaluate(expr).await {
            Ok(result) => result.into_value().unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "page evaluation failed, treating as empty");
                T::default()
            }
        }
    }
}

fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl DomSurface for CdpSurface {
    async fn count(&self, selector: &str) -> Result<usize, CrawlError> {
        let expr = format!("document.querySelectorAll({}).length", js_str(selector));
        Ok(self.eval_or_default::<usize>(expr).await)
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>, CrawlError> {
        let expr = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.innerText || '')",
            js_str(selector)
        );
        Ok(self.eval_or_default(expr).await)
    }

    async fn attrs(&self, selector: &str, attr: &str) -> Result<Vec<String>, CrawlError> {
        let expr = format!(
            "Array.from(document.querySelectorAll({})).map(el => el.getAttribute({}) || '')",
            js_str(selector),
            js_str(attr)
        );
        Ok(self.eval_or_default(expr).await)
    }

    async fn click_first(&self, selector: &str) -> Result<bool, CrawlError> {
        match self.page.find_element(selector).await {
            Ok(element) => {
                element.click().await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<bool, CrawlError> {
        match self.page.find_element(selector).await {
            Ok(element) => {
                element.click().await?;
                element.type_str(text).await?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn scoped_texts(
        &self,
        scope: &str,
        index: usize,
        inner: &str,
    ) -> Result<Vec<String>, CrawlError> {
        let expr = format!(
            "(() => {{ const s = document.querySelectorAll({})[{index}]; \
             return s ? Array.from(s.querySelectorAll({})).map(el => el.innerText || '') : []; }})()",
            js_str(scope),
            js_str(inner)
        );
        Ok(self.eval_or_default(expr).await)
    }

    async fn scoped_attrs(
        &self,
        scope: &str,
        index: usize,
        inner: &str,
        attr: &str,
    ) -> Result<Vec<String>, CrawlError> {
        let expr = format!(
            "(() => {{ const s = document.querySelectorAll({})[{index}]; \
             return s ? Array.from(s.querySelectorAll({})).map(el => el.getAttribute({}) || '') : []; }})()",
            js_str(scope),
            js_str(inner),
            js_str(attr)
        );
        Ok(self.eval_or_default(expr).await)
    }

    async fn scoped_click_all(
        &self,
        scope: &str,
        index: usize,
        inner: &str,
    ) -> Result<usize, CrawlError> {
        let expr = format!(
            "(() => {{ const s = document.querySelectorAll({})[{index}]; \
             if (!s) return 0; let n = 0; \
             for (const el of s.querySelectorAll({})) {{ \
               if (el.offsetParent !== null) {{ el.click(); n++; }} }} \
             return n; }})()",
            js_str(scope),
            js_str(inner)
        );
        Ok(self.eval_or_default::<usize>(expr).await)
    }

    async fn scroll_into_view(&self, selector: &str, index: usize) -> Result<bool, CrawlError> {
        let expr = format!(
            "(() => {{ const el = document.querySelectorAll({})[{index}]; \
             if (!el) return false; el.scrollIntoView({{block: 'center'}}); return true; }})()",
            js_str(selector)
        );
        Ok(self.eval_or_default::<bool>(expr).await)
    }

    async fn scroll_to_bottom(&self) -> Result<(), CrawlError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)".to_string())
            .await?;
        Ok(())
    }

    async fn wait_for_present(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, CrawlError> {
        self.wait_for_count_above(selector, 0, timeout).await
    }

    async fn wait_for_count_above(
        &self,
        selector: &str,
        above: usize,
        timeout: Duration,
    ) -> Result<bool, CrawlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(selector).await? > above {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn reload(&self) -> Result<(), CrawlError> {
        self.page.reload().await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), CrawlError> {
        self.page.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_escaped_for_embedding() {
        assert_eq!(js_str("a[href='/@x']"), r#""a[href='/@x']""#);
        assert_eq!(js_str("span\"quote"), r#""span\"quote""#);
    }
}
