use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionType {
    Spelling,
    Grammar,
    Style,
    Punctuation,
    Clarity,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// A proposed edit. Immutable once created; `id` identifies it for one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default = "new_id")]
    pub id: String,
    pub original: String,
    pub suggestion: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(rename = "type")]
    pub kind: SuggestionType,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<i64>,
}

impl Suggestion {
    pub fn new(original: &str, suggestion: &str, kind: SuggestionType, severity: Severity) -> Self {
        Self {
            id: new_id(),
            original: original.to_string(),
            suggestion: suggestion.to_string(),
            explanation: String::new(),
            kind,
            severity,
            start_index: None,
            end_index: None,
        }
    }

    pub fn with_span(mut self, start: i64, end: i64) -> Self {
        self.start_index = Some(start);
        self.end_index = Some(end);
        self
    }

    pub fn with_explanation(mut self, explanation: &str) -> Self {
        self.explanation = explanation.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedSentence {
    pub sentence: String,
    pub tone: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneAnalysis {
    pub overall_tone: String,
    /// 0.0 - 1.0
    pub overall_score: f32,
    #[serde(default)]
    pub highlighted_sentences: Vec<HighlightedSentence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// A non-blocking idea surfaced by inactivity-driven ideation.
#[derive(Debug, Clone, PartialEq)]
pub struct IdeaNotification {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl IdeaNotification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            created_at: Utc::now(),
            read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_parses_service_payload() {
        let raw = r#"{
            "id": "s1",
            "original": "teh",
            "suggestion": "the",
            "explanation": "Typo",
            "type": "Spelling",
            "severity": "High",
            "startIndex": 4,
            "endIndex": 7
        }"#;
        let s: Suggestion = serde_json::from_str(raw).unwrap();
        assert_eq!(s.id, "s1");
        assert_eq!(s.kind, SuggestionType::Spelling);
        assert_eq!(s.start_index, Some(4));
        assert_eq!(s.end_index, Some(7));
    }

    #[test]
    fn unknown_type_and_missing_id_are_tolerated() {
        let raw = r#"{"original":"a","suggestion":"b","type":"Tone","severity":"Low"}"#;
        let s: Suggestion = serde_json::from_str(raw).unwrap();
        assert_eq!(s.kind, SuggestionType::Other);
        assert!(!s.id.is_empty());
        assert!(s.start_index.is_none());
    }

    #[test]
    fn chat_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage {
            role: Role::Assistant,
            content: "hi".into(),
            timestamp: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
