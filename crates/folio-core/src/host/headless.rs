//! In-memory host used by tests and the simulator
//!
//! [`HeadlessDocument`] is an element arena built from a [`PageSpec`]
//! (TOML or JSON) that records every mutation. [`HeadlessPage`] wraps it with
//! a [`Host`] and plays the browser's part: it pushes events, advances the
//! clock frame by frame and runs layout passes.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::document::{Document, ElementId, ReadyState, Rect, ScrollBehavior, Viewport};
use super::events::{Event, PerformanceEntry};
use super::selector::{Matchable, Selector};
use super::Host;
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportSpec {
    #[serde(default = "default_viewport_width")]
    pub width: f64,
    #[serde(default = "default_viewport_height")]
    pub height: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self {
            width: default_viewport_width(),
            height: default_viewport_height(),
            scroll_y: 0.0,
        }
    }
}

fn default_viewport_width() -> f64 {
    1280.0
}

fn default_viewport_height() -> f64 {
    800.0
}

/// One element of a page description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub class: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub text: String,
    /// Offset from the top of the document
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    /// Defaults to the viewport width
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: f64,
    /// `id` of an element declared earlier
    #[serde(default)]
    pub parent: Option<String>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn at(mut self, top: f64, height: f64) -> Self {
        self.top = top;
        self.height = height;
        self
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }
}

/// Page description: viewport plus a flat element list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSpec {
    #[serde(default)]
    pub viewport: ViewportSpec,
    #[serde(default)]
    pub ready_state: ReadyState,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

impl PageSpec {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a page file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_toml(&content),
        }
    }
}

/// Recorded document write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    ClassAdded { element: ElementId, class: String },
    ClassRemoved { element: ElementId, class: String },
    Style {
        element: ElementId,
        property: String,
        value: String,
    },
    Text { element: ElementId, text: String },
    Attribute {
        element: ElementId,
        name: String,
        value: String,
    },
    ScrollTo { y: f64, behavior: ScrollBehavior },
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    text: String,
    rect: Rect,
    parent: Option<ElementId>,
    connected: bool,
}

impl Matchable for ElementData {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn element_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            _ => self.attributes.get(name).map(String::as_str),
        }
    }
}

#[derive(Debug, Default)]
struct DocumentState {
    ready_state: ReadyState,
    viewport: Viewport,
    elements: Vec<ElementData>,
    mutations: Vec<Mutation>,
}

impl DocumentState {
    fn connected(&self, element: ElementId) -> Option<&ElementData> {
        self.elements.get(element.0).filter(|e| e.connected)
    }

    fn connected_mut(&mut self, element: ElementId) -> Option<&mut ElementData> {
        self.elements.get_mut(element.0).filter(|e| e.connected)
    }

    fn document_height(&self) -> f64 {
        self.elements
            .iter()
            .filter(|e| e.connected)
            .map(|e| e.rect.bottom())
            .fold(0.0, f64::max)
    }

    fn max_scroll(&self) -> f64 {
        (self.document_height() - self.viewport.height).max(0.0)
    }
}

/// In-memory [`Document`] with a mutation log
#[derive(Debug, Default)]
pub struct HeadlessDocument {
    state: RefCell<DocumentState>,
}

impl HeadlessDocument {
    pub fn new(viewport_width: f64, viewport_height: f64) -> Self {
        let doc = Self::default();
        {
            let mut state = doc.state.borrow_mut();
            state.viewport.width = viewport_width;
            state.viewport.height = viewport_height;
        }
        doc
    }

    pub fn from_spec(spec: &PageSpec) -> Result<Self> {
        let doc = Self::new(spec.viewport.width, spec.viewport.height);
        doc.set_ready_state(spec.ready_state);
        for element in &spec.elements {
            doc.add_element(element)?;
        }
        doc.state.borrow_mut().viewport.scroll_y = spec.viewport.scroll_y.max(0.0);
        Ok(doc)
    }

    /// Append an element; its parent must already exist
    pub fn add_element(&self, spec: &ElementSpec) -> Result<ElementId> {
        if spec.tag.trim().is_empty() {
            return Err(Error::Page("element without a tag".to_string()));
        }
        let mut state = self.state.borrow_mut();
        if let Some(ref id) = spec.id {
            if state.elements.iter().any(|e| e.id.as_deref() == Some(id.as_str())) {
                return Err(Error::Page(format!("duplicate element id '{}'", id)));
            }
        }
        let parent = match spec.parent {
            Some(ref parent_id) => Some(
                state
                    .elements
                    .iter()
                    .position(|e| e.id.as_deref() == Some(parent_id.as_str()))
                    .map(ElementId)
                    .ok_or_else(|| Error::Page(format!("unknown parent '{}'", parent_id)))?,
            ),
            None => None,
        };

        let mut classes: Vec<String> = Vec::new();
        for class in &spec.class {
            if !classes.contains(class) {
                classes.push(class.clone());
            }
        }

        let width = spec.width.unwrap_or(state.viewport.width);
        let element = ElementData {
            tag: spec.tag.to_ascii_lowercase(),
            id: spec.id.clone(),
            classes,
            attributes: spec.attrs.clone(),
            styles: BTreeMap::new(),
            text: spec.text.clone(),
            rect: Rect::new(spec.top, spec.left, width, spec.height),
            parent,
            connected: true,
        };
        state.elements.push(element);
        Ok(ElementId(state.elements.len() - 1))
    }

    /// Detach an element and its whole subtree
    pub fn remove_element(&self, element: ElementId) {
        let mut state = self.state.borrow_mut();
        let count = state.elements.len();
        let doomed: Vec<usize> = (0..count)
            .filter(|&idx| Self::is_descendant(&state.elements, ElementId(idx), element))
            .collect();
        for idx in doomed {
            state.elements[idx].connected = false;
        }
    }

    fn is_descendant(elements: &[ElementData], node: ElementId, ancestor: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = elements.get(id.0).and_then(|e| e.parent);
        }
        false
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.state.borrow_mut().ready_state = ready_state;
    }

    /// Move the viewport without recording a mutation (user scrolling)
    pub fn set_scroll_y(&self, y: f64) {
        let mut state = self.state.borrow_mut();
        let max = state.max_scroll();
        state.viewport.scroll_y = y.clamp(0.0, max);
    }

    pub fn set_viewport_size(&self, width: f64, height: f64) {
        let mut state = self.state.borrow_mut();
        state.viewport.width = width;
        state.viewport.height = height;
    }

    /// Drain the mutation log
    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.state.borrow_mut().mutations)
    }

    pub fn mutation_count(&self) -> usize {
        self.state.borrow().mutations.len()
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.state
            .borrow()
            .elements
            .get(element.0)
            .map(|e| e.classes.clone())
            .unwrap_or_default()
    }

    /// JSON view of every connected element's mutable state
    pub fn snapshot(&self) -> serde_json::Value {
        let state = self.state.borrow();
        let elements: Vec<serde_json::Value> = state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.connected)
            .map(|(idx, e)| {
                serde_json::json!({
                    "element": idx,
                    "tag": e.tag,
                    "id": e.id,
                    "classes": e.classes,
                    "attributes": e.attributes,
                    "styles": e.styles,
                    "text": e.text,
                })
            })
            .collect();
        serde_json::json!({
            "scroll_y": state.viewport.scroll_y,
            "elements": elements,
        })
    }

    fn record(&self, mutation: Mutation) {
        self.state.borrow_mut().mutations.push(mutation);
    }
}

impl Document for HeadlessDocument {
    fn ready_state(&self) -> ReadyState {
        self.state.borrow().ready_state
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.state
            .borrow()
            .elements
            .iter()
            .position(|e| e.connected && e.id.as_deref() == Some(id))
            .map(ElementId)
    }

    fn query_all(&self, selector: &Selector) -> Vec<ElementId> {
        self.state
            .borrow()
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.connected && selector.matches(*e))
            .map(|(idx, _)| ElementId(idx))
            .collect()
    }

    fn is_connected(&self, element: ElementId) -> bool {
        self.state.borrow().connected(element).is_some()
    }

    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let state = self.state.borrow();
        state.connected(node).is_some() && Self::is_descendant(&state.elements, node, ancestor)
    }

    fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.state
            .borrow()
            .connected(element)
            .and_then(|e| Matchable::attribute(e, name).map(str::to_string))
    }

    fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        let changed = match self.state.borrow_mut().connected_mut(element) {
            Some(e) => {
                e.attributes.insert(name.to_string(), value.to_string());
                true
            }
            None => false,
        };
        if changed {
            self.record(Mutation::Attribute {
                element,
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.state
            .borrow()
            .connected(element)
            .map(|e| Matchable::has_class(e, class))
            .unwrap_or(false)
    }

    fn add_class(&self, element: ElementId, class: &str) {
        let added = match self.state.borrow_mut().connected_mut(element) {
            Some(e) if !e.classes.iter().any(|c| c == class) => {
                e.classes.push(class.to_string());
                true
            }
            _ => false,
        };
        if added {
            self.record(Mutation::ClassAdded {
                element,
                class: class.to_string(),
            });
        }
    }

    fn remove_class(&self, element: ElementId, class: &str) {
        let removed = match self.state.borrow_mut().connected_mut(element) {
            Some(e) => {
                let before = e.classes.len();
                e.classes.retain(|c| c != class);
                e.classes.len() != before
            }
            None => false,
        };
        if removed {
            self.record(Mutation::ClassRemoved {
                element,
                class: class.to_string(),
            });
        }
    }

    fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.state
            .borrow()
            .connected(element)
            .and_then(|e| e.styles.get(property).cloned())
    }

    fn set_style(&self, element: ElementId, property: &str, value: &str) {
        let changed = match self.state.borrow_mut().connected_mut(element) {
            Some(e) => {
                e.styles.insert(property.to_string(), value.to_string());
                true
            }
            None => false,
        };
        if changed {
            self.record(Mutation::Style {
                element,
                property: property.to_string(),
                value: value.to_string(),
            });
        }
    }

    fn text(&self, element: ElementId) -> Option<String> {
        self.state.borrow().connected(element).map(|e| e.text.clone())
    }

    fn set_text(&self, element: ElementId, text: &str) {
        let changed = match self.state.borrow_mut().connected_mut(element) {
            Some(e) => {
                e.text = text.to_string();
                true
            }
            None => false,
        };
        if changed {
            self.record(Mutation::Text {
                element,
                text: text.to_string(),
            });
        }
    }

    fn offset_top(&self, element: ElementId) -> Option<f64> {
        self.state.borrow().connected(element).map(|e| e.rect.top)
    }

    fn client_height(&self, element: ElementId) -> Option<f64> {
        self.state.borrow().connected(element).map(|e| e.rect.height)
    }

    fn bounding_rect(&self, element: ElementId) -> Option<Rect> {
        let state = self.state.borrow();
        let scroll_y = state.viewport.scroll_y;
        state.connected(element).map(|e| Rect {
            top: e.rect.top - scroll_y,
            ..e.rect
        })
    }

    fn viewport(&self) -> Viewport {
        self.state.borrow().viewport
    }

    fn scroll_to(&self, y: f64, behavior: ScrollBehavior) {
        self.set_scroll_y(y);
        let y = self.state.borrow().viewport.scroll_y;
        self.record(Mutation::ScrollTo { y, behavior });
    }
}

/// Headless stand-in for a browser tab
pub struct HeadlessPage {
    document: Rc<HeadlessDocument>,
    host: Host,
    frame_interval: Duration,
    last_scroll_y: Cell<f64>,
}

impl HeadlessPage {
    pub fn new(document: HeadlessDocument, frame_interval: Duration) -> Self {
        let document = Rc::new(document);
        let last_scroll_y = Cell::new(document.viewport().scroll_y);
        let host = Host::new(document.clone());
        Self {
            document,
            host,
            frame_interval: frame_interval.max(Duration::from_millis(1)),
            last_scroll_y,
        }
    }

    pub fn from_spec(spec: &PageSpec, frame_interval: Duration) -> Result<Self> {
        Ok(Self::new(HeadlessDocument::from_spec(spec)?, frame_interval))
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn document(&self) -> &HeadlessDocument {
        &self.document
    }

    pub fn now(&self) -> Duration {
        self.host.scheduler().now()
    }

    /// Finish parsing: mark the document interactive and announce it
    pub fn content_loaded(&self) {
        self.document.set_ready_state(ReadyState::Interactive);
        self.host.dispatch(&Event::DomContentLoaded);
        self.settle();
    }

    /// Finish loading every resource
    pub fn load(&self, load_time: Duration) {
        self.document.set_ready_state(ReadyState::Complete);
        self.host.dispatch(&Event::Load { load_time });
        self.settle();
    }

    /// User scroll to `y`
    pub fn scroll_to(&self, y: f64) {
        self.document.set_scroll_y(y);
        self.settle();
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.document.set_viewport_size(width, height);
        self.host.dispatch(&Event::Resize);
        self.settle();
    }

    pub fn pointer_move(&self, x: f64, y: f64) {
        self.dispatch(Event::PointerMove { x, y });
    }

    pub fn pointer_enter(&self, target: ElementId) {
        self.dispatch(Event::PointerEnter { target });
    }

    pub fn pointer_leave(&self, target: ElementId) {
        self.dispatch(Event::PointerLeave { target });
    }

    pub fn click(&self, target: ElementId) {
        self.dispatch(Event::Click { target });
    }

    pub fn key_press(&self, key: &str) {
        self.dispatch(Event::KeyPress {
            key: key.to_string(),
        });
    }

    pub fn raise_error(&self, message: &str) {
        self.dispatch(Event::Error {
            message: message.to_string(),
        });
    }

    pub fn reject(&self, reason: &str) {
        self.dispatch(Event::UnhandledRejection {
            reason: reason.to_string(),
        });
    }

    pub fn report_performance(&self, entry: PerformanceEntry) {
        self.dispatch(Event::Performance(entry));
    }

    pub fn dispatch(&self, event: Event) {
        self.host.dispatch(&event);
        self.settle();
    }

    /// Run frames until `dt` has elapsed
    pub fn advance(&self, dt: Duration) {
        self.advance_to(self.now().saturating_add(dt));
    }

    /// Run frames at the configured interval up to `target`
    pub fn advance_to(&self, target: Duration) {
        let scheduler = self.host.scheduler().clone();
        while scheduler.now() < target {
            let next = (scheduler.now() + self.frame_interval).min(target);
            scheduler.run_frame(next);
            self.settle();
        }
    }

    /// Deliver the scroll event for programmatic scrolling and run a layout pass
    pub fn settle(&self) {
        let scroll_y = self.document.viewport().scroll_y;
        if scroll_y != self.last_scroll_y.get() {
            self.last_scroll_y.set(scroll_y);
            self.host.dispatch(&Event::Scroll);
        }
        self.host.layout_pass();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::events::EventKind;
    use crate::host::intersection::RootMargin;

    const PAGE: &str = r##"
        [viewport]
        width = 1000
        height = 600

        [[elements]]
        tag = "nav"
        class = ["nav"]
        id = "nav"
        height = 70

        [[elements]]
        tag = "a"
        class = ["nav-link"]
        parent = "nav"
        attrs = { href = "#about" }

        [[elements]]
        tag = "section"
        id = "about"
        class = ["section"]
        top = 700
        height = 800

        [[elements]]
        tag = "img"
        parent = "about"
        attrs = { loading = "lazy", "data-src" = "me.png" }
        top = 900
        height = 200
    "##;

    fn page() -> HeadlessPage {
        let spec = PageSpec::from_toml(PAGE).unwrap();
        HeadlessPage::from_spec(&spec, Duration::from_millis(16)).unwrap()
    }

    #[test]
    fn test_spec_loads_elements() {
        let page = page();
        let doc = page.document();
        assert_eq!(doc.select(".nav-link").unwrap().len(), 1);
        assert_eq!(doc.element_by_id("about"), Some(ElementId(2)));
        let img = doc.select_one(r#"img[loading="lazy"]"#).unwrap().unwrap();
        assert_eq!(doc.attribute(img, "data-src").as_deref(), Some("me.png"));
        assert!(doc.contains(ElementId(2), img));
        assert!(!doc.contains(ElementId(0), img));
    }

    #[test]
    fn test_rejects_unknown_parent_and_duplicate_ids() {
        let mut spec = PageSpec::default();
        spec.elements.push(ElementSpec::new("div").parent("missing"));
        assert!(HeadlessDocument::from_spec(&spec).is_err());

        let mut spec = PageSpec::default();
        spec.elements.push(ElementSpec::new("div").id("a"));
        spec.elements.push(ElementSpec::new("div").id("a"));
        assert!(HeadlessDocument::from_spec(&spec).is_err());
    }

    #[test]
    fn test_mutations_are_recorded_once() {
        let page = page();
        let doc = page.document();
        doc.add_class(ElementId(0), "scrolled");
        doc.add_class(ElementId(0), "scrolled");
        doc.remove_class(ElementId(0), "missing");
        doc.set_text(ElementId(1), "About");
        let log = doc.take_mutations();
        assert_eq!(log.len(), 2);
        assert_eq!(doc.mutation_count(), 0);
    }

    #[test]
    fn test_removed_subtree_is_disconnected() {
        let page = page();
        let doc = page.document();
        doc.remove_element(ElementId(2));
        assert!(!doc.is_connected(ElementId(2)));
        assert!(!doc.is_connected(ElementId(3)));
        assert!(doc.is_connected(ElementId(0)));
        assert!(doc.bounding_rect(ElementId(3)).is_none());
        doc.add_class(ElementId(3), "loaded");
        assert_eq!(doc.mutation_count(), 0);
    }

    #[test]
    fn test_scroll_clamps_and_dispatches() {
        let page = page();
        let scrolls = Rc::new(Cell::new(0));
        let s = scrolls.clone();
        page.host().events().on(EventKind::Scroll, move |_| s.set(s.get() + 1));

        page.scroll_to(10_000.0);
        // document height 1500, viewport 600
        assert_eq!(page.document().viewport().scroll_y, 900.0);
        assert_eq!(scrolls.get(), 1);

        page.scroll_to(900.0);
        assert_eq!(scrolls.get(), 1);

        page.document().scroll_to(0.0, ScrollBehavior::Smooth);
        page.advance(Duration::from_millis(16));
        assert_eq!(scrolls.get(), 2);
    }

    #[test]
    fn test_layout_pass_reports_crossings() {
        let page = page();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        page.host().intersections().observe(
            &[ElementId(3)],
            RootMargin::default(),
            0.1,
            move |entries| log.borrow_mut().extend(entries.iter().map(|e| e.crosses(0.1))),
        );

        page.settle();
        assert_eq!(*seen.borrow(), vec![false]);

        // img spans 900..1100; viewport 600 tall
        page.scroll_to(350.0);
        assert_eq!(*seen.borrow(), vec![false, true]);

        page.scroll_to(360.0);
        assert_eq!(seen.borrow().len(), 2);

        page.scroll_to(0.0);
        assert_eq!(*seen.borrow(), vec![false, true, false]);
    }

    #[test]
    fn test_root_margin_extends_viewport() {
        let page = page();
        let img = ElementId(3);
        // Top edge 300px below the viewport bottom
        assert!(!crate::host::intersection::measure(page.document(), img, &RootMargin::default())
            .unwrap()
            .is_intersecting);
        let grown = RootMargin::uniform(350.0);
        let entry = crate::host::intersection::measure(page.document(), img, &grown).unwrap();
        assert!(entry.is_intersecting);
        assert!((entry.ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_json_page() {
        let spec = PageSpec::from_json(
            r#"{"elements": [{"tag": "div", "id": "x", "class": ["a", "a"], "height": 10}]}"#,
        )
        .unwrap();
        let doc = HeadlessDocument::from_spec(&spec).unwrap();
        assert_eq!(doc.classes(ElementId(0)), vec!["a"]);
        assert_eq!(doc.snapshot()["elements"][0]["id"], "x");
    }
}
