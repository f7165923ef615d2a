//! Chromium-backed surfaces driven through chromiumoxide.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;
use webpilot_core_types::HandleId;

use crate::config::ChromiumConfig;
use crate::error::{SurfaceError, SurfaceErrorKind};
use crate::locator::Locator;
use crate::surface::{
    BrowserSlot, CandidateScope, ElementCandidate, PageSurface, SharedSurface, SurfaceDriver,
};

const TARGET_ATTR: &str = "data-webpilot-target";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ChromiumDriver {
    cfg: ChromiumConfig,
}

impl ChromiumDriver {
    pub fn new(cfg: ChromiumConfig) -> Self {
        Self { cfg }
    }

    fn browser_config(&self, index: usize) -> Result<BrowserConfig, SurfaceError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.cfg.request_timeout())
            .args(self.cfg.extra_args.clone());
        if !self.cfg.headless {
            builder = builder.with_head();
        }
        if self.cfg.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(executable) = &self.cfg.executable {
            builder = builder.chrome_executable(executable);
        }
        // Each slot needs its own profile or concurrent launches collide.
        let profile = self
            .cfg
            .user_data_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("webpilot-{}", std::process::id())))
            .join(format!("slot-{index}"));
        builder = builder.user_data_dir(profile);
        builder.build().map_err(SurfaceError::internal)
    }
}

#[async_trait]
impl SurfaceDriver for ChromiumDriver {
    async fn launch(&self, index: usize) -> Result<Arc<dyn BrowserSlot>, SurfaceError> {
        let config = self.browser_config(index)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(|err| {
            SurfaceError::new(SurfaceErrorKind::Internal)
                .with_hint(format!("chromium launch failed: {err}"))
        })?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "chromium handler stopped");
                    break;
                }
            }
        });
        info!(slot = index, headless = self.cfg.headless, "chromium launched");
        Ok(Arc::new(ChromiumSlot {
            index,
            browser: Arc::new(RwLock::new(Some(browser))),
            handler: Mutex::new(Some(handler_task)),
        }))
    }
}

struct ChromiumSlot {
    index: usize,
    browser: Arc<RwLock<Option<Browser>>>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl BrowserSlot for ChromiumSlot {
    fn index(&self) -> usize {
        self.index
    }

    async fn open_surface(&self) -> Result<SharedSurface, SurfaceError> {
        let page = new_blank_page(&self.browser).await?;
        Ok(Arc::new(ChromiumSurface {
            id: HandleId::new(),
            browser: Arc::clone(&self.browser),
            tabs: Mutex::new(vec![page]),
            active: AtomicUsize::new(0),
        }))
    }

    async fn shutdown(&self) -> Result<(), SurfaceError> {
        let mut guard = self.browser.write().await;
        if let Some(mut browser) = guard.take() {
            if let Err(err) = browser.close().await {
                warn!(slot = self.index, error = %err, "chromium close failed");
            }
            if let Err(err) = browser.wait().await {
                debug!(slot = self.index, error = %err, "chromium wait failed");
            }
        }
        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

async fn new_blank_page(browser: &RwLock<Option<Browser>>) -> Result<Page, SurfaceError> {
    let guard = browser.read().await;
    let browser = guard
        .as_ref()
        .ok_or_else(|| SurfaceError::new(SurfaceErrorKind::Closed))?;
    let page = browser.new_page("about:blank").await?;
    dismiss_dialogs(&page).await;
    Ok(page)
}

async fn dismiss_dialogs(page: &Page) {
    match page.event_listener::<EventJavascriptDialogOpening>().await {
        Ok(mut events) => {
            let page = page.clone();
            tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    info!(message = %event.message, "dialog dismissed");
                    if let Err(err) = page.execute(HandleJavaScriptDialogParams::new(false)).await {
                        debug!(error = %err, "dialog dismissal failed");
                    }
                }
            });
        }
        Err(err) => warn!(error = %err, "dialog listener unavailable"),
    }
}

pub struct ChromiumSurface {
    id: HandleId,
    browser: Arc<RwLock<Option<Browser>>>,
    tabs: Mutex<Vec<Page>>,
    active: AtomicUsize,
}

impl ChromiumSurface {
    async fn active_page(&self) -> Result<Page, SurfaceError> {
        let tabs = self.tabs.lock().await;
        tabs.get(self.active.load(Ordering::SeqCst))
            .cloned()
            .ok_or_else(|| SurfaceError::new(SurfaceErrorKind::Closed))
    }

    async fn navigate(page: &Page, url: &str, limit: Duration) -> Result<(), SurfaceError> {
        match timeout(limit, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(SurfaceError::nav_timeout(url)),
        }
    }

    /// Polls until the locator resolves, then returns the tagged element and its selector.
    async fn locate(
        &self,
        page: &Page,
        locator: &Locator,
        visible_only: bool,
        limit: Duration,
    ) -> Result<(Element, String), SurfaceError> {
        let token = Uuid::new_v4().simple().to_string();
        let script = locate_script(locator, &token, visible_only);
        let tagged = format!("[{TARGET_ATTR}=\"{token}\"]");
        let deadline = Instant::now() + limit;
        loop {
            let found: bool = page
                .evaluate(script.as_str())
                .await?
                .into_value()
                .map_err(|err| SurfaceError::internal(err.to_string()))?;
            if found {
                let element = page.find_element(tagged.as_str()).await?;
                return Ok((element, tagged));
            }
            if Instant::now() >= deadline {
                return Err(SurfaceError::not_found(locator.to_descriptor()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl PageSurface for ChromiumSurface {
    fn id(&self) -> &HandleId {
        &self.id
    }

    async fn goto(&self, url: &str, limit: Duration) -> Result<(), SurfaceError> {
        let page = self.active_page().await?;
        Self::navigate(&page, url, limit).await
    }

    async fn current_url(&self) -> Result<String, SurfaceError> {
        let page = self.active_page().await?;
        Ok(page.url().await?.unwrap_or_default())
    }

    async fn click(&self, locator: &Locator, limit: Duration) -> Result<(), SurfaceError> {
        let page = self.active_page().await?;
        let (element, _) = self.locate(&page, locator, true, limit).await?;
        element.click().await?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str, limit: Duration) -> Result<(), SurfaceError> {
        let page = self.active_page().await?;
        let (element, tagged) = self.locate(&page, locator, true, limit).await?;
        let clear = format!(
            "(() => {{ const el = document.querySelector({}); if (el && 'value' in el) {{ el.value = ''; }} }})()",
            js_str(&tagged)
        );
        page.evaluate(clear).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn read_text(&self, selector: &str, limit: Duration) -> Result<String, SurfaceError> {
        let page = self.active_page().await?;
        let script = format!(
            "(() => {{ try {{ const el = document.querySelector({}); if (!el) return null; return (el.innerText || el.textContent || '').trim(); }} catch (e) {{ return null; }} }})()",
            js_str(selector)
        );
        let deadline = Instant::now() + limit;
        loop {
            let text: Option<String> = page
                .evaluate(script.as_str())
                .await?
                .into_value()
                .map_err(|err| SurfaceError::internal(err.to_string()))?;
            if let Some(text) = text {
                return Ok(text);
            }
            if Instant::now() >= deadline {
                return Err(SurfaceError::new(SurfaceErrorKind::Timeout).with_hint(selector.to_string()));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn candidates(
        &self,
        scope: CandidateScope,
        limit: usize,
    ) -> Result<Vec<ElementCandidate>, SurfaceError> {
        let page = self.active_page().await?;
        let query = match scope {
            CandidateScope::Actionable => "button, a, [role=button], [type=submit]",
            CandidateScope::Editable => "input, textarea, [contenteditable=true]",
        };
        let script = format!(
            "(() => {{ const keys = ['aria-label', 'placeholder', 'name', 'id', 'title', 'value']; \
             return Array.from(document.querySelectorAll({query})).slice(0, {limit}).map(el => ({{ \
             text: (el.innerText || '').trim(), \
             attributes: keys.map(k => el.getAttribute(k)).filter(v => v) }})); }})()",
            query = js_str(query),
            limit = limit
        );
        page.evaluate(script)
            .await?
            .into_value()
            .map_err(|err| SurfaceError::internal(err.to_string()))
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), SurfaceError> {
        let page = self.active_page().await?;
        page.evaluate(format!("window.scrollBy(0, {pixels})")).await?;
        Ok(())
    }

    async fn set_input_files(
        &self,
        selector: &str,
        path: &Path,
        limit: Duration,
    ) -> Result<(), SurfaceError> {
        let page = self.active_page().await?;
        let (element, _) = self
            .locate(&page, &Locator::css(selector), true, limit)
            .await?;
        let mut params = SetFileInputFilesParams::new(vec![path.to_string_lossy().into_owned()]);
        params.backend_node_id = Some(element.backend_node_id.clone());
        page.execute(params).await?;
        Ok(())
    }

    async fn open_tab(&self, url: &str, limit: Duration) -> Result<(), SurfaceError> {
        let page = new_blank_page(&self.browser).await?;
        {
            let mut tabs = self.tabs.lock().await;
            tabs.push(page.clone());
            self.active.store(tabs.len() - 1, Ordering::SeqCst);
        }
        Self::navigate(&page, url, limit).await
    }

    async fn switch_tab(&self, index: usize) -> Result<bool, SurfaceError> {
        let tabs = self.tabs.lock().await;
        if index < tabs.len() {
            self.active.store(index, Ordering::SeqCst);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn content(&self) -> Result<String, SurfaceError> {
        let page = self.active_page().await?;
        Ok(page.content().await?)
    }

    async fn screenshot(&self, path: &Path) -> Result<(), SurfaceError> {
        let page = self.active_page().await?;
        page.save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        let tabs = std::mem::take(&mut *self.tabs.lock().await);
        for page in tabs {
            if let Err(err) = page.close().await {
                debug!(handle = %self.id, error = %err, "tab close failed");
            }
        }
        Ok(())
    }
}

fn js_str(raw: &str) -> String {
    Value::String(raw.to_string()).to_string()
}

/// Script that finds the first match for `locator`, tags it with `token` and reports success.
fn locate_script(locator: &Locator, token: &str, visible_only: bool) -> String {
    let (kind, value, name) = match locator {
        Locator::Css(selector) => ("css", selector.as_str(), ""),
        Locator::Role { role, name } => ("role", role.as_str(), name.as_str()),
        Locator::Placeholder(value) => ("placeholder", value.as_str(), ""),
        Locator::Label(value) => ("label", value.as_str(), ""),
        Locator::Text(value) => ("text", value.as_str(), ""),
    };
    format!(
        r#"(() => {{
  const kind = {kind}; const value = {value}; const name = {name}.toLowerCase();
  const needle = value.toLowerCase(); const token = {token}; const visibleOnly = {visible_only};
  const attr = {attr};
  const visible = (el) => {{
    const r = el.getBoundingClientRect(); const s = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
  }};
  const text = (el) => (el.innerText || el.textContent || '').trim().toLowerCase();
  let pool = [];
  if (kind === 'css') {{
    try {{ pool = Array.from(document.querySelectorAll(value)); }} catch (e) {{ return false; }}
  }} else if (kind === 'role') {{
    const extra = value === 'button' ? ', button, input[type=submit], input[type=button]' : '';
    pool = Array.from(document.querySelectorAll('[role="' + value + '"]' + extra)).filter(el => {{
      const label = (el.getAttribute('aria-label') || el.innerText || el.value || '').toLowerCase();
      return label.includes(name);
    }});
  }} else if (kind === 'placeholder') {{
    pool = Array.from(document.querySelectorAll('[placeholder]'))
      .filter(el => el.getAttribute('placeholder').toLowerCase().includes(needle));
  }} else if (kind === 'label') {{
    pool = Array.from(document.querySelectorAll('label'))
      .filter(l => text(l).includes(needle))
      .map(l => l.control || (l.htmlFor ? document.getElementById(l.htmlFor) : null))
      .filter(Boolean)
      .concat(Array.from(document.querySelectorAll('[aria-label]'))
        .filter(el => el.getAttribute('aria-label').toLowerCase().includes(needle)));
  }} else {{
    pool = Array.from(document.querySelectorAll('body *')).filter(el => text(el).includes(needle));
    pool.sort((a, b) => text(a).length - text(b).length);
  }}
  const hit = pool.find(el => !visibleOnly || visible(el));
  document.querySelectorAll('[' + attr + ']').forEach(el => el.removeAttribute(attr));
  if (!hit) return false;
  hit.setAttribute(attr, token);
  return true;
}})()"#,
        kind = js_str(kind),
        value = js_str(value),
        name = js_str(name),
        token = js_str(token),
        visible_only = visible_only,
        attr = js_str(TARGET_ATTR),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_script_escapes_values() {
        let script = locate_script(&Locator::Text("say \"hi\"".into()), "abc", true);
        assert!(script.contains(r#"const value = "say \"hi\"""#));
        assert!(script.contains("const visibleOnly = true"));
    }
}
