#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use engie::error::ApiError;
use engie::kernel::types::{ChatMessage, Severity, Suggestion, SuggestionType, ToneAnalysis};
use engie::page::snapshot::Rect;
use engie::{AnalysisApi, Controller, EngieConfig, PageSnapshot, StaticPage, TextBufferHost};

/// Scriptable stand-in for the analysis services. Counts every call.
pub struct MockApi {
    pub suggestion_calls: AtomicUsize,
    pub tone_calls: AtomicUsize,
    pub chat_calls: AtomicUsize,
    pub encouragement_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub prompts: Mutex<Vec<String>>,
    /// Keyed by a substring of the request text.
    suggestions: Mutex<Vec<(String, Vec<Suggestion>)>>,
    delays: Mutex<HashMap<String, Duration>>,
    tone: Mutex<String>,
    chat_reply: Mutex<String>,
    encouragement_reply: Mutex<String>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            suggestion_calls: AtomicUsize::new(0),
            tone_calls: AtomicUsize::new(0),
            chat_calls: AtomicUsize::new(0),
            encouragement_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            prompts: Mutex::new(Vec::new()),
            suggestions: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            tone: Mutex::new("Optimistic".to_string()),
            chat_reply: Mutex::new("What if the hero doubts the map?".to_string()),
            encouragement_reply: Mutex::new("This is coming along nicely!".to_string()),
        }
    }
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond_with(&self, text_contains: &str, suggestions: Vec<Suggestion>) {
        self.suggestions.lock().unwrap().push((text_contains.to_string(), suggestions));
    }

    pub fn delay_for(&self, text_contains: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(text_contains.to_string(), delay);
    }

    pub fn set_tone(&self, tone: &str) {
        *self.tone.lock().unwrap() = tone.to_string();
    }

    pub fn set_chat_reply(&self, reply: &str) {
        *self.chat_reply.lock().unwrap() = reply.to_string();
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    async fn pause_for(&self, text: &str) {
        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| text.contains(key.as_str()))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check(&self, endpoint: &'static str) -> Result<(), ApiError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(ApiError::Status { endpoint, status: 500 })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AnalysisApi for MockApi {
    async fn suggestions(&self, text: &str) -> Result<Vec<Suggestion>, ApiError> {
        self.suggestion_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_for(text).await;
        self.check("suggestions")?;
        let found = self
            .suggestions
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| text.contains(key.as_str()))
            .map(|(_, s)| s.clone());
        Ok(found.unwrap_or_default())
    }

    async fn analyze_tone(&self, text: &str) -> Result<ToneAnalysis, ApiError> {
        self.tone_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_for(text).await;
        self.check("tone")?;
        Ok(ToneAnalysis {
            overall_tone: self.tone.lock().unwrap().clone(),
            overall_score: 0.8,
            highlighted_sentences: Vec::new(),
        })
    }

    async fn chat(&self, prompt: &str, _history: &[ChatMessage]) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.check("chat")?;
        Ok(self.chat_reply.lock().unwrap().clone())
    }

    async fn encouragement(&self, _tone: &str, _score: Option<f32>) -> Result<String, ApiError> {
        self.encouragement_calls.fetch_add(1, Ordering::SeqCst);
        self.check("encouragement")?;
        Ok(self.encouragement_reply.lock().unwrap().clone())
    }
}

pub fn fix(original: &str, replacement: &str) -> Suggestion {
    Suggestion::new(original, replacement, SuggestionType::Spelling, Severity::High)
}

pub fn page_html(editor_text: &str) -> String {
    format!(
        r#"<html><body>
            <h1>My Draft</h1>
            <textarea id="editor">{}</textarea>
            <div id="suggestions-panel">Suggestions</div>
            <div id="engie-root"><p>Engie says hello</p></div>
        </body></html>"#,
        editor_text
    )
}

pub fn page(editor_text: &str) -> Arc<StaticPage> {
    Arc::new(StaticPage::new(
        PageSnapshot::new(page_html(editor_text))
            .with_box("editor", Rect::new(100.0, 100.0, 600.0, 400.0))
            .with_box("suggestions-panel", Rect::new(900.0, 100.0, 300.0, 400.0)),
    ))
}

pub struct Harness {
    pub controller: Controller,
    pub api: Arc<MockApi>,
    pub page: Arc<StaticPage>,
    pub host: Arc<TextBufferHost>,
}

impl Harness {
    pub fn new(editor_text: &str) -> Self {
        Self::with_config(editor_text, EngieConfig::default())
    }

    pub fn with_config(editor_text: &str, config: EngieConfig) -> Self {
        let api = MockApi::new();
        let page = page(editor_text);
        let host = Arc::new(TextBufferHost::new(editor_text));
        let controller = Controller::new(config, api.clone(), page.clone(), host.clone()).unwrap();
        Self { controller, api, page, host }
    }

    pub fn type_text(&self, editor_text: &str) {
        self.page.set_html(page_html(editor_text));
        self.host.set_text(editor_text);
    }
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
