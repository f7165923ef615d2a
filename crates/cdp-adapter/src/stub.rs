//! In-memory page surfaces for offline runs and tests.
//!
//! A [`StubSite`] maps URLs to static documents. Surfaces navigate between
//! them, match a small CSS subset, and append every operation to a shared
//! journal so callers can assert on what happened.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use webpilot_core_types::{host_of, HandleId};

use crate::error::{SurfaceError, SurfaceErrorKind};
use crate::locator::Locator;
use crate::surface::{
    BrowserSlot, CandidateScope, ElementCandidate, PageSurface, SharedSurface, SurfaceDriver,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    /// Text of an associated `<label>`.
    pub label: Option<String>,
    pub visible: bool,
}

impl StubElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            label: None,
            visible: true,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn attr(&self, key: &str) -> Option<String> {
        match key {
            "id" => self.id.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            _ => self.attrs.get(key).cloned(),
        }
    }

    fn is_actionable(&self) -> bool {
        matches!(self.tag.as_str(), "a" | "button")
            || self.attrs.get("role").map(String::as_str) == Some("button")
            || self.attrs.get("type").map(String::as_str) == Some("submit")
    }

    fn is_editable(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea")
            || self.attrs.get("contenteditable").map(String::as_str) == Some("true")
    }

    fn has_role(&self, role: &str) -> bool {
        if self.attrs.get("role").map(String::as_str) == Some(role) {
            return true;
        }
        role == "button"
            && (self.tag == "button"
                || (self.tag == "input"
                    && matches!(
                        self.attrs.get("type").map(String::as_str),
                        Some("submit") | Some("button")
                    )))
    }

    fn accessible_name(&self) -> String {
        self.attrs
            .get("aria-label")
            .cloned()
            .filter(|v| !v.is_empty())
            .or_else(|| (!self.text.is_empty()).then(|| self.text.clone()))
            .or_else(|| self.attrs.get("value").cloned())
            .unwrap_or_default()
    }

    fn matches_css(&self, selector: &str) -> bool {
        selector
            .split(',')
            .map(str::trim)
            .filter(|simple| !simple.is_empty())
            .any(|simple| self.matches_simple(simple))
    }

    /// Supports `tag`, `#id`, `.class`, `[attr]`, `[attr=value]` and `*`; no combinators.
    fn matches_simple(&self, simple: &str) -> bool {
        let chars: Vec<char> = simple.chars().collect();
        let mut pos = 0;
        let ident = |pos: &mut usize| {
            let start = *pos;
            while *pos < chars.len()
                && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '-' || chars[*pos] == '_')
            {
                *pos += 1;
            }
            chars[start..*pos].iter().collect::<String>()
        };

        if pos < chars.len() && chars[pos] == '*' {
            pos += 1;
        } else {
            let tag = ident(&mut pos);
            if !tag.is_empty() && !tag.eq_ignore_ascii_case(&self.tag) {
                return false;
            }
        }

        while pos < chars.len() {
            match chars[pos] {
                '#' => {
                    pos += 1;
                    let id = ident(&mut pos);
                    if self.id.as_deref() != Some(id.as_str()) {
                        return false;
                    }
                }
                '.' => {
                    pos += 1;
                    let class = ident(&mut pos);
                    if !self.classes.iter().any(|c| *c == class) {
                        return false;
                    }
                }
                '[' => {
                    let Some(offset) = chars[pos..].iter().position(|c| *c == ']') else {
                        return false;
                    };
                    let inner: String = chars[pos + 1..pos + offset].iter().collect();
                    pos += offset + 1;
                    let (key, expected) = match inner.split_once('=') {
                        Some((key, value)) => (
                            key.trim().to_ascii_lowercase(),
                            Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string()),
                        ),
                        None => (inner.trim().to_ascii_lowercase(), None),
                    };
                    match (self.attr(&key), expected) {
                        (None, _) => return false,
                        (Some(actual), Some(expected)) if actual != expected => return false,
                        _ => {}
                    }
                }
                _ => return false,
            }
        }
        true
    }

    fn matches_locator(&self, locator: &Locator) -> bool {
        match locator {
            Locator::Css(selector) => self.matches_css(selector),
            Locator::Role { role, name } => {
                self.has_role(role) && contains_ci(&self.accessible_name(), name)
            }
            Locator::Placeholder(value) => self
                .attrs
                .get("placeholder")
                .map(|p| contains_ci(p, value))
                .unwrap_or(false),
            Locator::Label(value) => {
                self.label.as_deref().map(|l| contains_ci(l, value)).unwrap_or(false)
                    || self
                        .attrs
                        .get("aria-label")
                        .map(|l| contains_ci(l, value))
                        .unwrap_or(false)
            }
            Locator::Text(value) => !self.text.is_empty() && contains_ci(&self.text, value),
        }
    }

    fn candidate(&self) -> ElementCandidate {
        let attributes = ["aria-label", "placeholder", "name", "id", "title", "value"]
            .iter()
            .filter_map(|key| self.attr(key))
            .filter(|value| !value.is_empty())
            .collect();
        ElementCandidate {
            text: if self.visible { self.text.trim().to_string() } else { String::new() },
            attributes,
        }
    }

    fn render(&self) -> String {
        let mut attrs = String::new();
        if let Some(id) = &self.id {
            attrs.push_str(&format!(" id=\"{id}\""));
        }
        if !self.classes.is_empty() {
            attrs.push_str(&format!(" class=\"{}\"", self.classes.join(" ")));
        }
        for (key, value) in &self.attrs {
            attrs.push_str(&format!(" {key}=\"{value}\""));
        }
        format!("<{tag}{attrs}>{text}</{tag}>", tag = self.tag, text = self.text)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A static page: title plus a flat element list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubDocument {
    pub title: String,
    pub elements: Vec<StubElement>,
}

impl StubDocument {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            elements: vec![StubElement::new("title").with_text(title.clone()).hidden()],
            title,
        }
    }

    pub fn with(mut self, element: StubElement) -> Self {
        self.elements.push(element);
        self
    }

    fn render(&self) -> String {
        let body: Vec<String> = self
            .elements
            .iter()
            .filter(|el| el.tag != "title")
            .map(StubElement::render)
            .collect();
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            self.title,
            body.join("")
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct StubSite {
    documents: HashMap<String, StubDocument>,
}

impl StubSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, document: StubDocument) -> Self {
        self.documents.insert(normalize(url), document);
        self
    }

    /// Unknown URLs resolve to an empty page titled after the host.
    pub fn resolve(&self, url: &str) -> StubDocument {
        self.documents
            .get(&normalize(url))
            .cloned()
            .unwrap_or_else(|| StubDocument::new(host_of(url).unwrap_or_default()))
    }

    /// Small site used by `--stub` runs.
    pub fn demo() -> Self {
        Self::new()
            .page(
                "https://example.com",
                StubDocument::new("Example Domain")
                    .with(StubElement::new("h1").with_text("Example Domain"))
                    .with(StubElement::new("p").with_text(
                        "This domain is for use in illustrative examples in documents.",
                    ))
                    .with(
                        StubElement::new("a")
                            .with_attr("href", "https://www.iana.org/domains/example")
                            .with_text("More information..."),
                    ),
            )
            .page(
                "https://www.iana.org/domains/example",
                StubDocument::new("IANA-managed Reserved Domains")
                    .with(StubElement::new("h1").with_text("Example Domains")),
            )
    }
}

fn normalize(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// One recorded surface operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StubEvent {
    Goto(String),
    GotoFailed(String),
    Click { descriptor: String, hit: bool },
    Fill { descriptor: String, text: String, hit: bool },
    Upload { selector: String, path: PathBuf },
    Scroll(i64),
    OpenTab(String),
    SwitchTab(usize),
    Screenshot(PathBuf),
    Closed(HandleId),
}

#[derive(Default)]
struct StubState {
    journal: Mutex<Vec<StubEvent>>,
    launches: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    shutdowns: AtomicUsize,
    failing_gotos: AtomicUsize,
    fail_launch: AtomicBool,
    misses_time_out: AtomicBool,
    surface_limit: Mutex<Option<usize>>,
}

impl StubState {
    fn record(&self, event: StubEvent) {
        self.journal.lock().push(event);
    }

    /// Error for a click or fill whose target is absent.
    fn miss(&self, descriptor: String) -> SurfaceError {
        if self.misses_time_out.load(Ordering::SeqCst) {
            SurfaceError::new(SurfaceErrorKind::Timeout).with_hint(descriptor)
        } else {
            SurfaceError::not_found(descriptor)
        }
    }
}

/// Driver whose slots mint [`StubSurface`]s over a shared [`StubSite`].
#[derive(Clone)]
pub struct StubDriver {
    site: Arc<StubSite>,
    state: Arc<StubState>,
}

impl StubDriver {
    pub fn new(site: StubSite) -> Self {
        Self {
            site: Arc::new(site),
            state: Arc::new(StubState::default()),
        }
    }

    /// The next `count` navigations fail with a navigation timeout.
    pub fn fail_next_gotos(&self, count: usize) {
        self.state.failing_gotos.store(count, Ordering::SeqCst);
    }

    /// Missing click/fill targets report a wait timeout, as a real browser
    /// does, instead of an immediate not-found.
    pub fn time_out_on_missing_targets(&self, flag: bool) {
        self.state.misses_time_out.store(flag, Ordering::SeqCst);
    }

    pub fn fail_launches(&self, flag: bool) {
        self.state.fail_launch.store(flag, Ordering::SeqCst);
    }

    /// Caps the total number of surfaces ever opened.
    pub fn limit_surfaces(&self, limit: usize) {
        *self.state.surface_limit.lock() = Some(limit);
    }

    pub fn journal(&self) -> Vec<StubEvent> {
        self.state.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.state.journal.lock().clear();
    }

    pub fn launches(&self) -> usize {
        self.state.launches.load(Ordering::SeqCst)
    }

    pub fn surfaces_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn surfaces_closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.state.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurfaceDriver for StubDriver {
    async fn launch(&self, index: usize) -> Result<Arc<dyn BrowserSlot>, SurfaceError> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(SurfaceError::internal(format!("stub launch {index} refused")));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubSlot {
            index,
            site: Arc::clone(&self.site),
            state: Arc::clone(&self.state),
            shut: AtomicBool::new(false),
        }))
    }
}

struct StubSlot {
    index: usize,
    site: Arc<StubSite>,
    state: Arc<StubState>,
    shut: AtomicBool,
}

#[async_trait]
impl BrowserSlot for StubSlot {
    fn index(&self) -> usize {
        self.index
    }

    async fn open_surface(&self) -> Result<SharedSurface, SurfaceError> {
        if self.shut.load(Ordering::SeqCst) {
            return Err(SurfaceError::new(SurfaceErrorKind::Closed));
        }
        let limit = *self.state.surface_limit.lock();
        let previous = self.state.opened.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = limit {
            if previous >= limit {
                self.state.opened.fetch_sub(1, Ordering::SeqCst);
                return Err(SurfaceError::internal("stub surface limit reached"));
            }
        }
        Ok(Arc::new(StubSurface {
            id: HandleId::new(),
            site: Arc::clone(&self.site),
            state: Arc::clone(&self.state),
            tabs: Mutex::new(Tabs {
                pages: vec![StubTab::blank()],
                active: 0,
                closed: false,
            }),
        }))
    }

    async fn shutdown(&self) -> Result<(), SurfaceError> {
        if !self.shut.swap(true, Ordering::SeqCst) {
            self.state.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct StubTab {
    url: String,
    document: StubDocument,
}

impl StubTab {
    fn blank() -> Self {
        Self {
            url: "about:blank".into(),
            document: StubDocument::new(""),
        }
    }
}

struct Tabs {
    pages: Vec<StubTab>,
    active: usize,
    closed: bool,
}

impl Tabs {
    fn active(&mut self) -> Result<&mut StubTab, SurfaceError> {
        if self.closed {
            return Err(SurfaceError::new(SurfaceErrorKind::Closed));
        }
        let active = self.active;
        self.pages
            .get_mut(active)
            .ok_or_else(|| SurfaceError::new(SurfaceErrorKind::Closed))
    }
}

pub struct StubSurface {
    id: HandleId,
    site: Arc<StubSite>,
    state: Arc<StubState>,
    tabs: Mutex<Tabs>,
}

impl StubSurface {
    fn find_visible(tab: &StubTab, locator: &Locator) -> Option<usize> {
        let hits = tab
            .document
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.visible && el.matches_locator(locator));
        if matches!(locator, Locator::Text(_)) {
            // Innermost match first, like a text engine would.
            hits.min_by_key(|(_, el)| el.text.len()).map(|(idx, _)| idx)
        } else {
            hits.map(|(idx, _)| idx).next()
        }
    }
}

#[async_trait]
impl PageSurface for StubSurface {
    fn id(&self) -> &HandleId {
        &self.id
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), SurfaceError> {
        let mut tabs = self.tabs.lock();
        let tab = tabs.active()?;
        let pending = self.state.failing_gotos.load(Ordering::SeqCst);
        if pending > 0 {
            self.state.failing_gotos.store(pending - 1, Ordering::SeqCst);
            self.state.record(StubEvent::GotoFailed(url.to_string()));
            return Err(SurfaceError::nav_timeout(url));
        }
        tab.url = url.to_string();
        tab.document = self.site.resolve(url);
        self.state.record(StubEvent::Goto(url.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SurfaceError> {
        let mut tabs = self.tabs.lock();
        Ok(tabs.active()?.url.clone())
    }

    async fn click(&self, locator: &Locator, _timeout: Duration) -> Result<(), SurfaceError> {
        let mut tabs = self.tabs.lock();
        let tab = tabs.active()?;
        let descriptor = locator.to_descriptor();
        let Some(idx) = Self::find_visible(tab, locator) else {
            self.state.record(StubEvent::Click { descriptor: descriptor.clone(), hit: false });
            return Err(self.state.miss(descriptor));
        };
        self.state.record(StubEvent::Click { descriptor, hit: true });
        if let Some(href) = tab.document.elements[idx].attrs.get("href").cloned() {
            if href.starts_with("http://") || href.starts_with("https://") {
                tab.document = self.site.resolve(&href);
                tab.url = href;
            }
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str, _timeout: Duration) -> Result<(), SurfaceError> {
        let mut tabs = self.tabs.lock();
        let tab = tabs.active()?;
        let descriptor = locator.to_descriptor();
        let hit = Self::find_visible(tab, locator);
        self.state.record(StubEvent::Fill {
            descriptor: descriptor.clone(),
            text: text.to_string(),
            hit: hit.is_some(),
        });
        let idx = hit.ok_or_else(|| self.state.miss(descriptor))?;
        tab.document.elements[idx]
            .attrs
            .insert("value".into(), text.to_string());
        Ok(())
    }

    async fn read_text(&self, selector: &str, _timeout: Duration) -> Result<String, SurfaceError> {
        let mut tabs = self.tabs.lock();
        let tab = tabs.active()?;
        tab.document
            .elements
            .iter()
            .find(|el| el.matches_css(selector))
            .map(|el| el.text.trim().to_string())
            .ok_or_else(|| SurfaceError::new(SurfaceErrorKind::Timeout).with_hint(selector.to_string()))
    }

    async fn candidates(
        &self,
        scope: CandidateScope,
        limit: usize,
    ) -> Result<Vec<ElementCandidate>, SurfaceError> {
        let mut tabs = self.tabs.lock();
        let tab = tabs.active()?;
        Ok(tab
            .document
            .elements
            .iter()
            .filter(|el| match scope {
                CandidateScope::Actionable => el.is_actionable(),
                CandidateScope::Editable => el.is_editable(),
            })
            .take(limit)
            .map(StubElement::candidate)
            .collect())
    }

    async fn scroll_by(&self, pixels: i64) -> Result<(), SurfaceError> {
        self.tabs.lock().active()?;
        self.state.record(StubEvent::Scroll(pixels));
        Ok(())
    }

    async fn set_input_files(
        &self,
        selector: &str,
        path: &Path,
        _timeout: Duration,
    ) -> Result<(), SurfaceError> {
        let mut tabs = self.tabs.lock();
        let tab = tabs.active()?;
        Self::find_visible(tab, &Locator::css(selector))
            .ok_or_else(|| SurfaceError::not_found(selector.to_string()))?;
        self.state.record(StubEvent::Upload {
            selector: selector.to_string(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    async fn open_tab(&self, url: &str, _timeout: Duration) -> Result<(), SurfaceError> {
        let mut tabs = self.tabs.lock();
        tabs.active()?;
        tabs.pages.push(StubTab {
            url: url.to_string(),
            document: self.site.resolve(url),
        });
        tabs.active = tabs.pages.len() - 1;
        self.state.record(StubEvent::OpenTab(url.to_string()));
        Ok(())
    }

    async fn switch_tab(&self, index: usize) -> Result<bool, SurfaceError> {
        let mut tabs = self.tabs.lock();
        tabs.active()?;
        if index >= tabs.pages.len() {
            return Ok(false);
        }
        tabs.active = index;
        self.state.record(StubEvent::SwitchTab(index));
        Ok(true)
    }

    async fn content(&self) -> Result<String, SurfaceError> {
        let mut tabs = self.tabs.lock();
        Ok(tabs.active()?.document.render())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), SurfaceError> {
        let url = self.current_url().await?;
        tokio::fs::write(path, format!("stub screenshot of {url}"))
            .await
            .map_err(|err| SurfaceError::internal(err.to_string()))?;
        self.state.record(StubEvent::Screenshot(path.to_path_buf()));
        Ok(())
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        let mut tabs = self.tabs.lock();
        if !tabs.closed {
            tabs.closed = true;
            self.state.closed.fetch_add(1, Ordering::SeqCst);
            self.state.record(StubEvent::Closed(self.id.clone()));
            debug!(handle = %self.id, "stub surface closed");
        }
        Ok(())
    }
}
