use scraper::{ElementRef, Selector};
use tracing::debug;

use super::extractor::element_text;
use super::snapshot::{is_inside_companion, is_skipped, PageView, Rect};

/// A semantic place on the page the companion may want to sit next to.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorTarget {
    SuggestionsPanel,
    WritingArea,
    AnalysisArea,
    /// The element that contains this piece of text (a suggestion's `original`).
    SuggestionText(String),
}

/// One way of locating an anchor. Strategies are tried in order until one answers.
pub trait AnchorStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn resolve(&self, target: &AnchorTarget, page: &PageView) -> Option<Rect>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAnchor {
    pub strategy: &'static str,
    pub rect: Rect,
}

pub struct AnchorResolver {
    strategies: Vec<Box<dyn AnchorStrategy>>,
}

impl AnchorResolver {
    pub fn new(strategies: Vec<Box<dyn AnchorStrategy>>) -> Self {
        Self { strategies }
    }

    /// Explicit selectors, then semantic search, then generic page landmarks.
    pub fn standard(target_selector: &str) -> Self {
        Self::new(vec![
            Box::new(ExplicitSelectorStrategy::standard(target_selector)),
            Box::new(SemanticTextStrategy),
            Box::new(GenericFallbackStrategy::default()),
        ])
    }

    pub fn resolve(&self, target: &AnchorTarget, page: &PageView) -> Option<ResolvedAnchor> {
        let resolved = self.strategies.iter().find_map(|strategy| {
            strategy.resolve(target, page).map(|rect| ResolvedAnchor {
                strategy: strategy.name(),
                rect,
            })
        });
        match &resolved {
            Some(anchor) => debug!("Anchor for {:?} resolved by {}", target, anchor.strategy),
            None => debug!("No anchor for {:?}", target),
        }
        resolved
    }
}

fn first_laid_out(page: &PageView, selectors: &[String]) -> Option<Rect> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        page.document
            .select(&selector)
            .filter(|el| !is_inside_companion(*el))
            .find_map(|el| page.box_for(el))
    })
}

/// Well-known selectors per target.
pub struct ExplicitSelectorStrategy {
    suggestions_panel: Vec<String>,
    writing_area: Vec<String>,
    analysis_area: Vec<String>,
}

impl ExplicitSelectorStrategy {
    pub fn new(suggestions_panel: Vec<String>, writing_area: Vec<String>, analysis_area: Vec<String>) -> Self {
        Self {
            suggestions_panel,
            writing_area,
            analysis_area,
        }
    }

    pub fn standard(target_selector: &str) -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let mut writing_area = vec![target_selector.to_string()];
        writing_area.extend(owned(&["[data-engie-anchor=\"writing\"]", "#editor"]));
        Self::new(
            owned(&["[data-engie-anchor=\"suggestions\"]", "#suggestions-panel", "#suggestions"]),
            writing_area,
            owned(&["[data-engie-anchor=\"analysis\"]", "#analysis-panel", "#tone-analysis"]),
        )
    }
}

impl AnchorStrategy for ExplicitSelectorStrategy {
    fn name(&self) -> &'static str {
        "explicit"
    }

    fn resolve(&self, target: &AnchorTarget, page: &PageView) -> Option<Rect> {
        let selectors = match target {
            AnchorTarget::SuggestionsPanel => &self.suggestions_panel,
            AnchorTarget::WritingArea => &self.writing_area,
            AnchorTarget::AnalysisArea => &self.analysis_area,
            AnchorTarget::SuggestionText(_) => return None,
        };
        first_laid_out(page, selectors)
    }
}

/// Looks for meaning rather than exact selectors: id, class or aria-label
/// keywords for panels, and the innermost element containing the text for suggestions.
pub struct SemanticTextStrategy;

impl SemanticTextStrategy {
    fn keywords(target: &AnchorTarget) -> &'static [&'static str] {
        match target {
            AnchorTarget::SuggestionsPanel => &["suggestion"],
            AnchorTarget::WritingArea => &["editor", "writing", "draft", "compose"],
            AnchorTarget::AnalysisArea => &["analysis", "tone", "insight"],
            AnchorTarget::SuggestionText(_) => &[],
        }
    }
}

impl AnchorStrategy for SemanticTextStrategy {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn resolve(&self, target: &AnchorTarget, page: &PageView) -> Option<Rect> {
        if let AnchorTarget::SuggestionText(needle) = target {
            let needle = needle.trim();
            if needle.is_empty() {
                return None;
            }
            return text_node_parent(page, needle)
                .or_else(|| innermost_spanning(page, needle))
                .and_then(|el| page.box_for(el));
        }

        let keywords = Self::keywords(target);
        page.elements()
            .filter(|el| {
                let value = el.value();
                let mut labels = value.id().into_iter().chain(value.classes()).chain(value.attr("aria-label"));
                labels.any(|label| {
                    let label = label.to_lowercase();
                    keywords.iter().any(|k| label.contains(k))
                })
            })
            .find_map(|el| page.box_for(el))
    }
}

/// Parent of the first visible text node holding the whole needle, in one walk.
fn text_node_parent<'a>(page: &'a PageView, needle: &str) -> Option<ElementRef<'a>> {
    page.document
        .root_element()
        .descendants()
        .filter(|node| node.value().as_text().is_some_and(|text| text.contains(needle)))
        .filter_map(|node| node.parent().and_then(ElementRef::wrap))
        .find(|el| !is_inside_companion(*el) && !is_skipped(*el))
}

/// Needles that cross inline markup match no single text node; take the
/// smallest element whose combined text holds them.
fn innermost_spanning<'a>(page: &'a PageView, needle: &str) -> Option<ElementRef<'a>> {
    page.elements()
        .filter_map(|el| {
            let text = element_text(el);
            text.contains(needle).then_some((text.len(), el))
        })
        .min_by_key(|(len, _)| *len)
        .map(|(_, el)| el)
}

/// Page landmarks that exist on almost any page.
pub struct GenericFallbackStrategy {
    selectors: Vec<String>,
}

impl Default for GenericFallbackStrategy {
    fn default() -> Self {
        Self {
            selectors: ["main", "article", "[contenteditable]", "textarea", "body"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl AnchorStrategy for GenericFallbackStrategy {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn resolve(&self, _target: &AnchorTarget, page: &PageView) -> Option<Rect> {
        first_laid_out(page, &self.selectors)
    }
}
