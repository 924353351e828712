//! In-memory [`BrowserSession`] for tests.
//!
//! Pages are keyed by URL and hold a flat list of elements. Each element
//! answers to one or more exact [`Selector`] values, so tests register
//! elements with the same selectors the site profile uses. Clicks can reveal
//! hidden elements or append page text, and scrolling can append batches of
//! elements, which is enough to script a full apply flow or pagination.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use super::{BrowserError, BrowserSession, Cookie, ElementHandle, Selector};

/// Something the fake browser was asked to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Navigate(String),
    Open(String),
    Close,
    Click(String),
    Clear(String),
    Keys(String, String),
    Scroll,
    AddCookie(String),
    Refresh,
}

#[derive(Debug, Clone)]
pub enum ClickEffect {
    /// Makes the element with this id present.
    Reveal(String),
    /// Appends to the page text.
    AppendText(String),
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    id: Option<String>,
    selectors: Vec<Selector>,
    text: String,
    attributes: HashMap<String, String>,
    displayed: bool,
    enabled: bool,
    selected: bool,
    present: bool,
    parent: Option<String>,
    children: Vec<FakeElement>,
    on_click: Vec<ClickEffect>,
}

impl FakeElement {
    pub fn new(selector: Selector) -> Self {
        Self {
            id: None,
            selectors: vec![selector],
            text: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
            selected: false,
            present: true,
            parent: None,
            children: Vec::new(),
            on_click: Vec::new(),
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Not in the DOM until revealed by a click.
    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    pub fn child(mut self, child: FakeElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click.push(effect);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: Vec<FakeElement>,
    text: String,
    scroll_batches: VecDeque<Vec<FakeElement>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, element: FakeElement) -> Self {
        push_flat(&mut self.elements, element, None);
        self
    }

    pub fn page_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    /// Elements appended by the next scroll.
    pub fn on_scroll(mut self, batch: Vec<FakeElement>) -> Self {
        self.scroll_batches.push_back(batch);
        self
    }
}

fn push_flat(into: &mut Vec<FakeElement>, mut element: FakeElement, parent: Option<String>) {
    let id = element
        .id
        .clone()
        .unwrap_or_else(|| format!("el-{}", into.len() + 1));
    element.id = Some(id.clone());
    element.parent = parent;
    let children = std::mem::take(&mut element.children);
    into.push(element);
    for child in children {
        push_flat(into, child, Some(id.clone()));
    }
}

#[derive(Debug, Default)]
struct State {
    pages: HashMap<String, FakePage>,
    tabs: Vec<String>,
    broken: HashSet<String>,
    actions: Vec<Action>,
    cookies: Vec<Cookie>,
}

impl State {
    fn current(&self) -> Option<&FakePage> {
        self.tabs.last().and_then(|url| self.pages.get(url))
    }

    fn current_mut(&mut self) -> Option<&mut FakePage> {
        let url = self.tabs.last()?.clone();
        self.pages.get_mut(&url)
    }

    fn element(&self, handle: &ElementHandle) -> Result<&FakeElement, BrowserError> {
        self.current()
            .and_then(|page| {
                page.elements
                    .iter()
                    .find(|e| e.present && e.id.as_deref() == Some(handle.0.as_str()))
            })
            .ok_or_else(|| BrowserError::NoSuchElement(handle.0.clone()))
    }

    fn element_mut(&mut self, handle: &ElementHandle) -> Result<&mut FakeElement, BrowserError> {
        self.current_mut()
            .and_then(|page| {
                page.elements
                    .iter_mut()
                    .find(|e| e.present && e.id.as_deref() == Some(handle.0.as_str()))
            })
            .ok_or_else(|| BrowserError::NoSuchElement(handle.0.clone()))
    }
}

#[derive(Debug, Default)]
pub struct FakeBrowser {
    state: Mutex<State>,
}

impl FakeBrowser {
    /// A browser whose single tab shows `page` at `url`.
    pub fn with_page(url: &str, page: FakePage) -> Self {
        let browser = Self::default();
        browser.add_page(url, page);
        browser.lock().tabs.push(url.to_string());
        browser
    }

    pub fn add_page(&self, url: &str, page: FakePage) {
        self.lock().pages.insert(url.to_string(), page);
    }

    /// Opening this URL in a new context fails.
    pub fn break_url(&self, url: &str) {
        self.lock().broken.insert(url.to_string());
    }

    pub fn actions(&self) -> Vec<Action> {
        self.lock().actions.clone()
    }

    pub fn tab_count(&self) -> usize {
        self.lock().tabs.len()
    }

    pub fn set_cookies(&self, cookies: Vec<Cookie>) {
        self.lock().cookies = cookies;
    }

    /// Current `value` of an element on the page at `url`.
    pub fn value_of(&self, url: &str, id: &str) -> Option<String> {
        let state = self.lock();
        state
            .pages
            .get(url)?
            .elements
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .and_then(|e| e.attributes.get("value").cloned())
    }

    pub fn is_checked(&self, url: &str, id: &str) -> bool {
        let state = self.lock();
        state
            .pages
            .get(url)
            .and_then(|p| p.elements.iter().find(|e| e.id.as_deref() == Some(id)))
            .is_some_and(|e| e.selected)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BrowserSession for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.actions.push(Action::Navigate(url.to_string()));
        match state.tabs.last_mut() {
            Some(top) => *top = url.to_string(),
            None => state.tabs.push(url.to_string()),
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<(), BrowserError> {
        self.lock().actions.push(Action::Refresh);
        Ok(())
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, BrowserError> {
        let state = self.lock();
        Ok(state
            .current()
            .map(|page| {
                page.elements
                    .iter()
                    .filter(|e| e.present && e.selectors.contains(selector))
                    .filter_map(|e| e.id.clone().map(ElementHandle))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let state = self.lock();
        state.element(parent)?;
        let page = state.current().expect("element lookup succeeded");
        let mut ancestry = HashSet::from([parent.0.clone()]);
        let mut found = Vec::new();
        for element in &page.elements {
            let Some(id) = element.id.clone() else { continue };
            if element.parent.as_ref().is_some_and(|p| ancestry.contains(p)) {
                ancestry.insert(id.clone());
                if element.present && element.selectors.contains(selector) {
                    found.push(ElementHandle(id));
                }
            }
        }
        Ok(found)
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        Ok(self.lock().element(element)?.text.clone())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.lock().element(element)?.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        Ok(self.lock().element(element)?.displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        Ok(self.lock().element(element)?.enabled)
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        Ok(self.lock().element(element)?.selected)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        let mut state = self.lock();
        let effects = {
            let el = state.element_mut(element)?;
            match el.attributes.get("type").map(String::as_str) {
                Some("checkbox") => el.selected = !el.selected,
                _ => el.selected = true,
            }
            el.on_click.clone()
        };
        state.actions.push(Action::Click(element.0.clone()));
        if let Some(page) = state.current_mut() {
            for effect in effects {
                match effect {
                    ClickEffect::Reveal(id) => {
                        if let Some(target) =
                            page.elements.iter_mut().find(|e| e.id.as_deref() == Some(id.as_str()))
                        {
                            target.present = true;
                        }
                    }
                    ClickEffect::AppendText(text) => {
                        page.text.push('\n');
                        page.text.push_str(&text);
                    }
                }
            }
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.element_mut(element)?.attributes.remove("value");
        state.actions.push(Action::Clear(element.0.clone()));
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state
            .element_mut(element)?
            .attributes
            .entry("value".to_string())
            .or_default()
            .push_str(text);
        state
            .actions
            .push(Action::Keys(element.0.clone(), text.to_string()));
        Ok(())
    }

    async fn page_text(&self) -> Result<String, BrowserError> {
        Ok(self
            .lock()
            .current()
            .map(|page| page.text.clone())
            .unwrap_or_default())
    }

    async fn open_context(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.actions.push(Action::Open(url.to_string()));
        if state.broken.contains(url) {
            return Err(BrowserError::Protocol {
                status: 500,
                error: "unknown error".into(),
                message: format!("net::ERR_CONNECTION_RESET at {url}"),
            });
        }
        state.tabs.push(url.to_string());
        Ok(())
    }

    async fn close_context(&self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        if state.tabs.len() <= 1 {
            return Err(BrowserError::UnexpectedResponse(
                "no secondary context to close".into(),
            ));
        }
        state.tabs.pop();
        state.actions.push(Action::Close);
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.actions.push(Action::Scroll);
        if let Some(page) = state.current_mut()
            && let Some(batch) = page.scroll_batches.pop_front()
        {
            for element in batch {
                push_flat(&mut page.elements, element, None);
            }
        }
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        Ok(self.lock().cookies.clone())
    }

    async fn add_cookie(&self, cookie: &Cookie) -> Result<(), BrowserError> {
        let mut state = self.lock();
        state.actions.push(Action::AddCookie(cookie.name.clone()));
        state.cookies.push(cookie.clone());
        Ok(())
    }
}
