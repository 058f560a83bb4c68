use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngieConfig;
use crate::error::{ApiError, EngieError, Result};
use crate::host::HostBridge;
use crate::page::anchor::{AnchorResolver, AnchorTarget};
use crate::page::extractor::TextExtractor;
use crate::page::snapshot::PageSource;
use crate::services::analysis::AnalysisApi;

use super::cancel::{RequestGate, RequestRegion};
use super::mood::{self, Interaction};
use super::position::{rest_position, PositionPlanner};
use super::presence::{ActiveTab, AnimationCue, Mood};
use super::prompt::{build_chat_prompt, build_ideation_prompt, IdeationKind};
use super::scheduler::{DeadlineTimer, TaskSlot};
use super::state::{EngieState, StateDelta};
use super::store::{lock, StateStore, Subscription};
use super::types::{ChatMessage, IdeaNotification, Suggestion};

const MISSING_CREDENTIALS_MESSAGE: &str =
    "Heightened mode needs an API key. Add one to your settings and try again.";

/// Which of the controller's timers are currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActiveTimers {
    pub debounce: bool,
    pub inactivity: bool,
    pub grok: bool,
    pub idea_cue: bool,
    pub position: bool,
}

impl ActiveTimers {
    pub fn any(&self) -> bool {
        self.debounce || self.inactivity || self.grok || self.idea_cue || self.position
    }
}

#[derive(Debug, Default)]
struct Memory {
    last_scanned_text: Option<String>,
    last_encouraged_tone: Option<String>,
    auto_ideations: usize,
}

struct ControllerInner {
    config: EngieConfig,
    store: StateStore,
    api: Arc<dyn AnalysisApi>,
    extractor: TextExtractor,
    host: Arc<dyn HostBridge>,
    planner: PositionPlanner,
    gate: RequestGate,

    debounce: TaskSlot,
    inactivity: DeadlineTimer,
    grok_timer: TaskSlot,
    idea_cue: TaskSlot,

    memory: Mutex<Memory>,
    subscription: Mutex<Option<Subscription>>,
    shut_down: AtomicBool,
}

impl ControllerInner {
    fn cancel_timers(&self) {
        self.debounce.cancel();
        self.inactivity.cancel();
        self.grok_timer.cancel();
        self.idea_cue.cancel();
        self.planner.stop();
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        self.cancel_timers();
        self.gate.cancel_all();
    }
}

/// Runs `fut` unless the ticket's token is cancelled first.
async fn unless_cancelled<F: Future>(
    token: &CancellationToken,
    endpoint: &'static str,
    fut: F,
) -> std::result::Result<F::Output, ApiError> {
    tokio::select! {
        _ = token.cancelled() => Err(ApiError::Cancelled { endpoint }),
        out = fut => Ok(out),
    }
}

fn long_enough(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() >= min_chars
}

/// The orchestrator. Owns every timer and asynchronous pipeline and writes
/// only through the [`StateStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

impl Controller {
    /// Must be called from inside a tokio runtime; timers are spawned onto it.
    pub fn new(
        config: EngieConfig,
        api: Arc<dyn AnalysisApi>,
        page: Arc<dyn PageSource>,
        host: Arc<dyn HostBridge>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| EngieError::NoRuntime)?;
        let store = StateStore::new(EngieState::with_notification_limit(
            config.thresholds.max_idea_notifications,
        ));
        let planner = PositionPlanner::new(
            store.clone(),
            page.clone(),
            AnchorResolver::standard(&config.target_selector),
            TaskSlot::new("position", runtime.clone()),
            config.position.clone(),
            config.timing.position_tick(),
        );

        let viewport = page.snapshot().viewport;
        store.dispatch(StateDelta::SetEngiePos(rest_position(viewport, &config.position)));

        let inner = Arc::new(ControllerInner {
            store: store.clone(),
            api,
            extractor: TextExtractor::new(page),
            host,
            planner,
            gate: RequestGate::new(),
            debounce: TaskSlot::new("debounce", runtime.clone()),
            inactivity: DeadlineTimer::new("inactivity", runtime.clone()),
            grok_timer: TaskSlot::new("grok", runtime.clone()),
            idea_cue: TaskSlot::new("idea-cue", runtime),
            memory: Mutex::new(Memory::default()),
            subscription: Mutex::new(None),
            shut_down: AtomicBool::new(false),
            config,
        });

        // Weak back-reference: the store must never keep the controller alive.
        let weak = Arc::downgrade(&inner);
        let subscription = store.subscribe(move |state| {
            if let Some(inner) = weak.upgrade() {
                Controller { inner }.evaluate_inactivity(state);
            }
        });
        *lock(&inner.subscription) = Some(subscription);

        let controller = Controller { inner };
        controller.evaluate_inactivity(&store.get_state());
        info!("Companion controller started (target '{}')", controller.inner.config.target_selector);
        Ok(controller)
    }

    pub fn store(&self) -> &StateStore {
        &self.inner.store
    }

    pub fn state(&self) -> Arc<EngieState> {
        self.inner.store.get_state()
    }

    pub fn planner(&self) -> &PositionPlanner {
        &self.inner.planner
    }

    pub fn config(&self) -> &EngieConfig {
        &self.inner.config
    }

    pub fn active_timers(&self) -> ActiveTimers {
        ActiveTimers {
            debounce: self.inner.debounce.is_active(),
            inactivity: self.inner.inactivity.is_active(),
            grok: self.inner.grok_timer.is_active(),
            idea_cue: self.inner.idea_cue.is_active(),
            position: self.inner.planner.is_moving(),
        }
    }

    fn dispatch(&self, delta: StateDelta) {
        self.inner.store.dispatch(delta);
    }

    fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    // === Suggestion pipeline ===

    /// Scans the target region for suggestions and tone.
    /// A newer scan supersedes this one; its results are then dropped.
    pub async fn scan_for_suggestions(&self) {
        let inner = &self.inner;
        let Some(text) = inner.extractor.extract_target(&inner.config.target_selector) else {
            debug!("Nothing to scan in '{}'", inner.config.target_selector);
            return;
        };
        if !long_enough(&text, inner.config.thresholds.min_scan_chars) {
            debug!("Skipping scan: {} chars is below the minimum", text.chars().count());
            return;
        }
        {
            let mut memory = lock(&inner.memory);
            if memory.last_scanned_text.as_deref() == Some(text.as_str()) {
                debug!("Skipping scan: text unchanged");
                return;
            }
            memory.last_scanned_text = Some(text.clone());
        }

        let ticket = inner.gate.begin(RequestRegion::TargetScan);
        info!("Scanning {} chars for suggestions", text.chars().count());
        self.dispatch(StateDelta::SetScanning(true));

        let api = inner.api.clone();
        let requests = async { tokio::join!(api.suggestions(&text), api.analyze_tone(&text)) };
        let (suggestions, tone) = match unless_cancelled(&ticket.token, "suggestions", requests).await {
            Ok(results) => results,
            Err(e) => {
                debug!("Scan {} superseded: {}", ticket.generation, e);
                return;
            }
        };
        if !inner.gate.is_current(&ticket) {
            debug!("Discarding stale scan {}", ticket.generation);
            return;
        }
        inner.gate.finish(&ticket);

        let suggestions = suggestions.unwrap_or_else(|e| {
            warn!("Suggestion service failed: {}", e);
            Vec::new()
        });
        let tone = tone.map_err(|e| warn!("Tone service failed: {}", e)).ok();
        let count = suggestions.len();
        let first = suggestions.first().cloned();

        self.dispatch(StateDelta::ScanCompleted { suggestions, tone });
        if let Some(first) = first {
            inner.planner.move_engie_to_suggestion(&first);
            self.dispatch(StateDelta::SetActiveTab(ActiveTab::Suggestions));
            self.dispatch(StateDelta::SetChatOpen(true));
        }
        let density = mood::suggestion_density(count, &text);
        self.dispatch(StateDelta::SetMood(mood::mood_from_density(density)));
        info!("Scan complete: {} suggestions", count);
    }

    /// Tone of the whole page, with an encouragement when the tone changed.
    pub async fn analyze_page_tone(&self) {
        let inner = &self.inner;
        let Some(text) = inner.extractor.extract_page() else {
            debug!("Page is empty; no tone to analyze");
            return;
        };
        if !long_enough(&text, inner.config.thresholds.min_scan_chars) {
            return;
        }

        let ticket = inner.gate.begin(RequestRegion::PageTone);
        let Ok(result) = unless_cancelled(&ticket.token, "tone", inner.api.analyze_tone(&text)).await else {
            return;
        };
        if !inner.gate.is_current(&ticket) {
            return;
        }

        let tone = match result {
            Ok(tone) => tone,
            Err(e) => {
                warn!("Page tone analysis failed: {}", e);
                inner.gate.finish(&ticket);
                self.dispatch(StateDelta::SetPageToneAnalysis(None));
                return;
            }
        };
        self.dispatch(StateDelta::SetPageToneAnalysis(Some(tone.clone())));
        self.dispatch(StateDelta::SetMood(mood::mood_from_tone(&tone.overall_tone)));

        let already_encouraged = {
            let memory = lock(&inner.memory);
            memory
                .last_encouraged_tone
                .as_deref()
                .is_some_and(|last| last.eq_ignore_ascii_case(&tone.overall_tone))
        };
        if already_encouraged {
            inner.gate.finish(&ticket);
            return;
        }
        let state = self.state();
        if !state.active_suggestions().is_empty() || state.ideation_message().is_some() {
            debug!("Something else is showing; holding encouragement");
            inner.gate.finish(&ticket);
            return;
        }

        let request = inner.api.encouragement(&tone.overall_tone, Some(tone.overall_score));
        let Ok(result) = unless_cancelled(&ticket.token, "encouragement", request).await else {
            return;
        };
        if !inner.gate.is_current(&ticket) {
            return;
        }
        inner.gate.finish(&ticket);

        match result {
            Ok(message) if !message.is_empty() => {
                if self.state().ideation_message().is_some() {
                    debug!("An idea arrived first; dropping encouragement");
                    return;
                }
                lock(&inner.memory).last_encouraged_tone = Some(tone.overall_tone.clone());
                self.dispatch(StateDelta::SetEncouragement(Some(message)));
            }
            Ok(_) => debug!("Empty encouragement"),
            Err(e) => warn!("Encouragement service failed: {}", e),
        }
    }

    /// Trailing-edge debounce: the scan runs once, a quiet period after the last call.
    pub fn debounced_scan(&self) {
        if self.is_shut_down() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        self.inner.debounce.schedule_once(self.inner.config.timing.debounce(), async move {
            if let Some(inner) = weak.upgrade() {
                Controller { inner }.scan_for_suggestions().await;
            }
        });
    }

    /// The host calls this on every edit.
    pub fn notify_text_changed(&self) {
        self.debounced_scan();
    }

    // === Ideation ===

    pub async fn trigger_ideation(&self, is_manual: bool) {
        let inner = &self.inner;
        let state = self.state();
        if state.is_ideating {
            debug!("Ideation already running");
            return;
        }
        let Some(page_text) = inner.extractor.extract_page() else {
            return;
        };
        if !long_enough(&page_text, inner.config.thresholds.min_ideation_chars) {
            debug!("Too little text to ideate on");
            return;
        }

        let (kind, prompt) = {
            let mut memory = lock(&inner.memory);
            let kind = IdeationKind::select(is_manual, memory.auto_ideations);
            if !is_manual {
                memory.auto_ideations += 1;
            }
            let prompt = build_ideation_prompt(kind, &page_text, memory.last_scanned_text.as_deref(), state.grok_active);
            (kind, prompt)
        };
        debug!("Ideation started ({:?})", kind);

        let ticket = inner.gate.begin(RequestRegion::Ideation);
        self.dispatch(StateDelta::SetIdeating(true));
        let history = state.chat_history().to_vec();

        let Ok(reply) = unless_cancelled(&ticket.token, "chat", inner.api.chat(&prompt, &history)).await else {
            return;
        };
        if !inner.gate.is_current(&ticket) {
            return;
        }
        inner.gate.finish(&ticket);

        let message = match reply {
            Ok(message) if !message.is_empty() => Some(message),
            Ok(_) => None,
            Err(e) => {
                warn!("Ideation request failed: {}", e);
                None
            }
        };

        match message {
            Some(message) if is_manual => {
                self.dispatch(StateDelta::SetIdeationMessage(Some(message)));
                self.dispatch(StateDelta::SetActiveTab(ActiveTab::Chat));
                self.dispatch(StateDelta::SetChatOpen(true));
                self.dispatch(StateDelta::RecordInteraction(Interaction::RequestedIdeas));
                self.dispatch(StateDelta::SetMood(mood::mood_from_interaction(Interaction::RequestedIdeas)));
                self.dispatch(StateDelta::SetIdeating(false));
                self.dispatch(StateDelta::Animate(AnimationCue::Attention));
            }
            Some(message) => {
                self.dispatch(StateDelta::PushIdeaNotification(IdeaNotification::new(message)));
                self.dispatch(StateDelta::SetIdeating(false));
                self.flash_idea_cue();
            }
            None => self.dispatch(StateDelta::SetIdeating(false)),
        }
    }

    /// Short visual cue for a new idea notification, cleared by its own timer.
    fn flash_idea_cue(&self) {
        self.dispatch(StateDelta::SetIdeaCue(true));
        let store = self.inner.store.clone();
        self.inner.idea_cue.schedule_once(self.inner.config.timing.idea_cue(), async move {
            store.dispatch(StateDelta::SetIdeaCue(false));
        });
    }

    /// Armed while nothing actionable is showing; every notification pushes the deadline out.
    fn evaluate_inactivity(&self, state: &EngieState) {
        if self.is_shut_down() {
            return;
        }
        if state.has_actionable_content() {
            self.inner.inactivity.cancel();
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        self.inner.inactivity.arm(self.inner.config.timing.inactivity(), move || async move {
            if let Some(inner) = weak.upgrade() {
                debug!("User idle; nudging");
                Controller { inner }.trigger_ideation(false).await;
            }
        });
    }

    // === Chat ===

    pub async fn send_chat_message(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let inner = &self.inner;
        let state = self.state();
        let history = state.chat_history().to_vec();

        self.dispatch(StateDelta::AppendChatMessage(ChatMessage::user(text)));
        self.dispatch(StateDelta::SetActiveTab(ActiveTab::Chat));
        self.dispatch(StateDelta::SetChatOpen(true));
        self.dispatch(StateDelta::RecordInteraction(Interaction::SentChat));

        let ticket = inner.gate.begin(RequestRegion::Chat);
        self.dispatch(StateDelta::SetChatLoading(true));
        let prompt = build_chat_prompt(text, state.grok_active);

        let Ok(reply) = unless_cancelled(&ticket.token, "chat", inner.api.chat(&prompt, &history)).await else {
            return;
        };
        if !inner.gate.is_current(&ticket) {
            return;
        }
        inner.gate.finish(&ticket);

        match reply {
            Ok(message) if !message.is_empty() => {
                self.dispatch(StateDelta::AppendChatMessage(ChatMessage::assistant(message)));
            }
            Ok(_) => {}
            Err(e) => warn!("Chat request failed: {}", e),
        }
        self.dispatch(StateDelta::SetChatLoading(false));
    }

    pub fn open_chat(&self) {
        self.dispatch(StateDelta::SetChatOpen(true));
    }

    pub fn close_chat(&self) {
        self.dispatch(StateDelta::SetChatOpen(false));
    }

    /// Clears the conversation and any proactive message, then closes the chat.
    pub fn dismiss_chat(&self) {
        self.inner.gate.cancel(RequestRegion::Chat);
        self.dispatch(StateDelta::ResetChat);
    }

    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.dispatch(StateDelta::SetActiveTab(tab));
    }

    pub fn mark_ideas_read(&self) {
        self.dispatch(StateDelta::MarkIdeasRead);
    }

    /// Toggles the chat. Opening it with nothing to show asks for ideas.
    pub async fn on_companion_clicked(&self) {
        let state = self.state();
        if state.chat_open {
            self.close_chat();
            return;
        }
        self.open_chat();
        if !self.state().has_actionable_content() {
            self.trigger_ideation(true).await;
        }
    }

    // === Suggestion cursor ===

    /// The host owns its own suggestion set; the engine mirrors it for display.
    pub fn set_external_suggestions(&self, suggestions: Vec<Suggestion>) {
        self.dispatch(StateDelta::SetExternalSuggestions(suggestions));
    }

    /// Asks the host to apply the current suggestion, then moves on.
    pub fn handle_apply(&self) {
        let state = self.state();
        let Some(current) = state.current_suggestion().cloned() else {
            return;
        };
        match self.inner.host.apply_suggestion(&current) {
            Ok(()) => {
                self.dispatch(StateDelta::RecordInteraction(Interaction::AppliedSuggestion));
                let state = self.state();
                let total = state.reviewed_total.max(state.applied_count);
                self.dispatch(StateDelta::SetMood(mood::mood_from_progress(state.applied_count, total)));
            }
            Err(e) => warn!("Host could not apply suggestion {}: {}", current.id, e),
        }
        self.handle_next();
    }

    pub fn handle_dismiss(&self) {
        let state = self.state();
        let Some(current) = state.current_suggestion().cloned() else {
            return;
        };
        if state.internal_suggestions().is_empty() {
            self.inner.host.dismiss_suggestion(&current.id);
        }
        self.dispatch(StateDelta::DismissSuggestion(current.id));
        self.dispatch(StateDelta::RecordInteraction(Interaction::DismissedSuggestion));

        match self.state().current_suggestion() {
            Some(next) => self.inner.planner.move_engie_to_suggestion(next),
            None => self.inner.planner.reset_engie_position(),
        }
    }

    /// Advances the cursor; past the last suggestion it resets instead of wrapping.
    pub fn handle_next(&self) {
        let state = self.state();
        let len = state.active_suggestions().len();
        let index = state.current_suggestion_index();
        if index + 1 < len {
            self.dispatch(StateDelta::SetSuggestionIndex(index + 1));
            if let Some(next) = self.state().current_suggestion() {
                self.inner.planner.move_engie_to_suggestion(next);
            }
        } else {
            self.reset_suggestions();
        }
    }

    fn reset_suggestions(&self) {
        self.dispatch(StateDelta::ClearSuggestions);
        self.inner.planner.reset_engie_position();
    }

    pub fn move_to_optimal_position(&self, target: AnchorTarget) {
        self.inner.planner.move_to_optimal_position(target);
    }

    // === Heightened mode ===

    /// Returns whether the mode is active afterwards.
    pub fn toggle_grok_mode(&self) -> bool {
        if self.state().grok_active {
            self.deactivate_grok_mode();
            false
        } else {
            self.activate_grok_mode()
        }
    }

    /// (Re)starts the time box. Any previous deactivation timer is replaced.
    pub fn activate_grok_mode(&self) -> bool {
        let inner = &self.inner;
        if !inner.config.has_grok_credentials() {
            warn!("Heightened mode requested without credentials");
            self.dispatch(StateDelta::AppendChatMessage(ChatMessage::assistant(MISSING_CREDENTIALS_MESSAGE)));
            self.dispatch(StateDelta::SetActiveTab(ActiveTab::Chat));
            self.dispatch(StateDelta::SetChatOpen(true));
            return false;
        }

        inner.grok_timer.cancel();
        let duration = inner.config.timing.grok_duration();
        let ends_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        self.dispatch(StateDelta::SetGrokMode { active: true, ends_at });
        self.dispatch(StateDelta::SetMood(Mood::Excited));

        let weak = Arc::downgrade(&self.inner);
        inner.grok_timer.schedule_once(duration, async move {
            if let Some(inner) = weak.upgrade() {
                Controller { inner }.deactivate_grok_mode();
            }
        });
        info!("Heightened mode on for {}s", duration.as_secs());
        true
    }

    /// Safe to call any number of times.
    pub fn deactivate_grok_mode(&self) {
        self.inner.grok_timer.cancel();
        if self.state().grok_active {
            self.dispatch(StateDelta::SetGrokMode { active: false, ends_at: None });
            info!("Heightened mode off");
        }
    }

    // === Teardown ===

    /// Stops every timer and in-flight request. Call before dropping the view.
    pub fn cleanup(&self) {
        let inner = &self.inner;
        inner.shut_down.store(true, Ordering::SeqCst);
        lock(&inner.subscription).take();
        inner.cancel_timers();
        inner.gate.cancel_all();

        let state = self.state();
        if state.is_scanning {
            self.dispatch(StateDelta::SetScanning(false));
        }
        if state.is_ideating {
            self.dispatch(StateDelta::SetIdeating(false));
        }
        if state.chat_loading {
            self.dispatch(StateDelta::SetChatLoading(false));
        }
        info!("Companion controller cleaned up");
    }
}
