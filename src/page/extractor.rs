use std::sync::Arc;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::snapshot::{is_companion, is_inside_companion, is_skipped, PageSource};

/// Reads plain text out of the host page. Never panics; "nothing found" is `None`.
#[derive(Clone)]
pub struct TextExtractor {
    source: Arc<dyn PageSource>,
}

impl TextExtractor {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self { source }
    }

    pub fn extract_target(&self, selector: &str) -> Option<String> {
        let snapshot = self.source.snapshot();
        extract_target_text(&snapshot.html, selector)
    }

    pub fn extract_page(&self) -> Option<String> {
        let snapshot = self.source.snapshot();
        extract_page_text(&snapshot.html)
    }
}

/// Text of the first element matching `selector` outside the companion's UI.
/// Native inputs yield their value; anything else yields its text nodes.
pub fn extract_target_text(html: &str, selector: &str) -> Option<String> {
    let selector = match Selector::parse(selector) {
        Ok(sel) => sel,
        Err(e) => {
            warn!("Invalid target selector '{}': {:?}", selector, e);
            return None;
        }
    };

    let document = Html::parse_document(html);
    let Some(target) = document.select(&selector).find(|el| !is_inside_companion(*el)) else {
        debug!("Target element not found");
        return None;
    };

    let text = if target.value().name() == "input" {
        target.value().attr("value").unwrap_or_default().trim().to_string()
    } else {
        element_text(target)
    };

    non_empty(text)
}

/// Text of the whole page body, minus the companion and script/style content.
pub fn extract_page_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .unwrap_or_else(|| document.root_element());

    non_empty(element_text(body))
}

/// Depth-first text walk; trimmed text nodes joined with single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(element, &mut parts);
    parts.join(" ")
}

fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed);
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_companion(child_el) && !is_skipped(child_el) {
                        collect_text(child_el, parts);
                    }
                }
            }
            _ => {}
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
