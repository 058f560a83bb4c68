use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{
    AnalysisApi, ChatRequest, EncouragementRequest, MessageResponse, SuggestionsResponse, TextRequest,
};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::kernel::types::{ChatMessage, Suggestion, ToneAnalysis};

const SUGGESTIONS: &str = "suggestions";
const TONE: &str = "tone";
const CHAT: &str = "chat";
const ENCOURAGEMENT: &str = "encouragement";

/// JSON-over-HTTP implementation of the analysis contracts.
#[derive(Clone)]
pub struct HttpAnalysisClient {
    client: Client,
    config: ApiConfig,
}

impl HttpAnalysisClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms)) // Network-level timeout
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, R>(&self, endpoint: &'static str, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: response.status().as_u16(),
            });
        }

        let parsed = response
            .json::<R>()
            .await
            .map_err(|source| ApiError::Decode { endpoint, source })?;
        debug!("{} request completed", endpoint);
        Ok(parsed)
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisClient {
    async fn suggestions(&self, text: &str) -> Result<Vec<Suggestion>, ApiError> {
        let body = TextRequest { text: text.to_string() };
        let resp: SuggestionsResponse = self.post(SUGGESTIONS, &self.config.suggestions_path, &body).await?;
        Ok(resp.suggestions)
    }

    async fn analyze_tone(&self, text: &str) -> Result<ToneAnalysis, ApiError> {
        let body = TextRequest { text: text.to_string() };
        self.post(TONE, &self.config.tone_path, &body).await
    }

    async fn chat(&self, prompt: &str, history: &[ChatMessage]) -> Result<String, ApiError> {
        let body = ChatRequest {
            prompt: prompt.to_string(),
            history: history.to_vec(),
        };
        let resp: MessageResponse = self.post(CHAT, &self.config.chat_path, &body).await?;
        Ok(resp.message.trim().to_string())
    }

    async fn encouragement(&self, overall_page_tone: &str, overall_score: Option<f32>) -> Result<String, ApiError> {
        let body = EncouragementRequest {
            overall_page_tone: overall_page_tone.to_string(),
            overall_score,
        };
        let resp: MessageResponse = self.post(ENCOURAGEMENT, &self.config.encouragement_path, &body).await?;
        Ok(resp.message.trim().to_string())
    }
}
