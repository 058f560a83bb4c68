//! The editor the companion lives next to. The engine never edits host text
//! itself; it asks the host through [`HostBridge`].

use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::ApplyError;
use crate::kernel::types::Suggestion;

pub trait HostBridge: Send + Sync {
    /// Replace `suggestion.original` with `suggestion.suggestion` in the host's text.
    fn apply_suggestion(&self, suggestion: &Suggestion) -> Result<(), ApplyError>;

    /// Remove a suggestion from the host-owned suggestion set.
    fn dismiss_suggestion(&self, id: &str);
}

/// Character span of a suggestion, when both indices are present and valid for `len` chars.
fn valid_span(suggestion: &Suggestion, len: usize) -> Option<(usize, usize)> {
    let start = usize::try_from(suggestion.start_index?).ok()?;
    let end = usize::try_from(suggestion.end_index?).ok()?;
    (start <= end && end <= len).then_some((start, end))
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(text.len())
}

/// Applies one suggestion to `text`.
///
/// A valid `[start, end)` span (in chars) is replaced exactly. Otherwise the first
/// literal occurrence of `original` is replaced; an empty `original` is refused.
pub fn apply_suggestion_to_text(text: &str, suggestion: &Suggestion) -> Result<String, ApplyError> {
    let len = text.chars().count();

    if let Some((start, end)) = valid_span(suggestion, len) {
        let (from, to) = (byte_offset(text, start), byte_offset(text, end));
        let mut out = String::with_capacity(text.len() + suggestion.suggestion.len());
        out.push_str(&text[..from]);
        out.push_str(&suggestion.suggestion);
        out.push_str(&text[to..]);
        return Ok(out);
    }

    if suggestion.original.is_empty() {
        return Err(ApplyError::EmptyOriginal {
            id: suggestion.id.clone(),
        });
    }

    match text.find(&suggestion.original) {
        Some(_) => Ok(text.replacen(&suggestion.original, &suggestion.suggestion, 1)),
        None => Err(ApplyError::NotFound {
            id: suggestion.id.clone(),
            original: suggestion.original.clone(),
        }),
    }
}

/// A host backed by an in-memory buffer. It also owns the external suggestion set.
#[derive(Debug, Default)]
pub struct TextBufferHost {
    text: RwLock<String>,
    suggestions: RwLock<Vec<Suggestion>>,
}

impl TextBufferHost {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
            suggestions: RwLock::new(Vec::new()),
        }
    }

    pub fn text(&self) -> String {
        self.text.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write().unwrap_or_else(|e| e.into_inner()) = text.into();
    }

    pub fn suggestions(&self) -> Vec<Suggestion> {
        self.suggestions.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_suggestions(&self, suggestions: Vec<Suggestion>) {
        *self.suggestions.write().unwrap_or_else(|e| e.into_inner()) = suggestions;
    }
}

impl HostBridge for TextBufferHost {
    fn apply_suggestion(&self, suggestion: &Suggestion) -> Result<(), ApplyError> {
        let mut text = self.text.write().unwrap_or_else(|e| e.into_inner());
        match apply_suggestion_to_text(&text, suggestion) {
            Ok(updated) => {
                *text = updated;
                debug!("Applied suggestion {}", suggestion.id);
                Ok(())
            }
            Err(e) => {
                warn!("Could not apply suggestion: {}", e);
                Err(e)
            }
        }
    }

    fn dismiss_suggestion(&self, id: &str) {
        self.suggestions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|s| s.id != id);
    }
}
