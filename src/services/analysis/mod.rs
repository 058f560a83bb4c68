//! Contracts of the four external analysis services.
//!
//! Transport lives behind [`AnalysisApi`]; the controller only sees results.
//! Implementations perform no retries and no caching.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::kernel::types::{ChatMessage, Suggestion, ToneAnalysis};

pub use client::HttpAnalysisClient;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncouragementRequest {
    pub overall_page_tone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Typo and grammar suggestions for `text`.
    async fn suggestions(&self, text: &str) -> Result<Vec<Suggestion>, ApiError>;

    async fn analyze_tone(&self, text: &str) -> Result<ToneAnalysis, ApiError>;

    /// A conversational reply to `prompt`, given the prior history.
    async fn chat(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, ApiError>;

    async fn encouragement(&self, overall_page_tone: &str, overall_score: Option<f32>) -> Result<String, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encouragement_request_uses_camel_case() {
        let body = serde_json::to_value(EncouragementRequest {
            overall_page_tone: "Optimistic".into(),
            overall_score: Some(0.8),
        })
        .unwrap();
        assert_eq!(body["overallPageTone"], "Optimistic");
        assert!((body["overallScore"].as_f64().unwrap() - 0.8).abs() < 1e-6);

        let body = serde_json::to_value(EncouragementRequest {
            overall_page_tone: "Flat".into(),
            overall_score: None,
        })
        .unwrap();
        assert!(body.get("overallScore").is_none());
    }

    #[test]
    fn suggestions_response_tolerates_missing_list() {
        let parsed: SuggestionsResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.suggestions.is_empty());
    }
}
