use std::collections::HashMap;
use std::sync::RwLock;

use scraper::{ElementRef, Html};

/// Elements carrying this id or attribute belong to the companion's own UI.
pub const COMPANION_ROOT_ID: &str = "engie-root";
pub const COMPANION_ROOT_ATTR: &str = "data-engie-root";

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// What the host hands over whenever the engine needs to look at the page:
/// markup, viewport size and the on-screen boxes of elements, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub html: String,
    pub viewport: Viewport,
    pub layout: HashMap<String, Rect>,
}

impl PageSnapshot {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    pub fn with_box(mut self, id: &str, rect: Rect) -> Self {
        self.layout.insert(id.to_string(), rect);
        self
    }
}

/// Host-side access to the live page.
pub trait PageSource: Send + Sync {
    fn snapshot(&self) -> PageSnapshot;
}

/// A page held in memory. The host (or a test) replaces its contents as the user types.
#[derive(Debug, Default)]
pub struct StaticPage {
    current: RwLock<PageSnapshot>,
}

impl StaticPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            current: RwLock::new(snapshot),
        }
    }

    pub fn replace(&self, snapshot: PageSnapshot) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    pub fn set_html(&self, html: impl Into<String>) {
        self.current.write().unwrap_or_else(|e| e.into_inner()).html = html.into();
    }
}

impl PageSource for StaticPage {
    fn snapshot(&self) -> PageSnapshot {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// A parsed snapshot. Not `Send`; build it, use it, drop it without awaiting.
pub struct PageView {
    pub document: Html,
    pub viewport: Viewport,
    layout: HashMap<String, Rect>,
}

impl PageView {
    pub fn parse(snapshot: &PageSnapshot) -> Self {
        Self {
            document: Html::parse_document(&snapshot.html),
            viewport: snapshot.viewport,
            layout: snapshot.layout.clone(),
        }
    }

    /// The element's own box, or the nearest laid-out ancestor's.
    pub fn box_for(&self, element: ElementRef<'_>) -> Option<Rect> {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .find_map(|el| el.value().id().and_then(|id| self.layout.get(id)).copied())
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| !is_inside_companion(*el) && !is_skipped(*el))
    }
}

pub(crate) fn is_companion(element: ElementRef<'_>) -> bool {
    let el = element.value();
    el.id() == Some(COMPANION_ROOT_ID) || el.attr(COMPANION_ROOT_ATTR).is_some()
}

pub(crate) fn is_skipped(element: ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&element.value().name())
}

pub(crate) fn is_inside_companion(element: ElementRef<'_>) -> bool {
    is_companion(element) || element.ancestors().filter_map(ElementRef::wrap).any(is_companion)
}
