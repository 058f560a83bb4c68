use chrono::{DateTime, Utc};

use super::mood::Interaction;
use super::presence::{ActiveTab, Animation, AnimationCue, AnimationGraph, Direction, Mood, Speed};
use super::types::{ChatMessage, IdeaNotification, Position, Suggestion, ToneAnalysis};

pub const DEFAULT_MAX_IDEA_NOTIFICATIONS: usize = 10;

/// Strict state delta. This is the ONLY way state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    SetScanning(bool),
    /// Replaces the suggestion list and the target-region tone slot in one step.
    ScanCompleted {
        suggestions: Vec<Suggestion>,
        tone: Option<ToneAnalysis>,
    },
    SetInternalSuggestions(Vec<Suggestion>),
    SetExternalSuggestions(Vec<Suggestion>),
    DismissSuggestion(String),
    SetSuggestionIndex(usize),
    /// Drops both suggestion sets and rewinds the cursor.
    ClearSuggestions,
    SetToneAnalysis(Option<ToneAnalysis>),
    SetPageToneAnalysis(Option<ToneAnalysis>),

    SetIdeating(bool),
    SetIdeationMessage(Option<String>),
    SetEncouragement(Option<String>),

    SetChatOpen(bool),
    SetChatLoading(bool),
    SetActiveTab(ActiveTab),
    AppendChatMessage(ChatMessage),
    ResetChat,

    PushIdeaNotification(IdeaNotification),
    MarkIdeasRead,
    SetIdeaCue(bool),

    SetEngiePos(Position),
    SetMotion { direction: Direction, speed: Speed },
    Animate(AnimationCue),
    SetMood(Mood),

    SetGrokMode {
        active: bool,
        ends_at: Option<DateTime<Utc>>,
    },
    RecordInteraction(Interaction),
}

/// Which slot currently owns the companion's speech bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryDisplay {
    Suggestions,
    Ideation,
    Encouragement,
    Nothing,
}

#[derive(Debug, Clone)]
pub struct EngieState {
    // Monotonic version, bumped by every reduction
    pub version: u64,

    // Suggestion lifecycle
    pub is_scanning: bool,
    internal_suggestions: Vec<Suggestion>,
    external_suggestions: Vec<Suggestion>,
    current_suggestion_index: usize,
    pub tone_analysis: Option<ToneAnalysis>,
    pub page_tone_analysis: Option<ToneAnalysis>,

    // Proactive messages
    pub is_ideating: bool,
    ideation_message: Option<String>,
    encouragement_message: Option<String>,

    // Chat surface
    pub chat_open: bool,
    pub chat_loading: bool,
    pub active_tab: ActiveTab,
    chat_history: Vec<ChatMessage>,

    // Idea notifications
    idea_notifications: Vec<IdeaNotification>,
    unread_ideas: usize,
    pub idea_cue: bool,
    max_idea_notifications: usize,

    // Companion body
    pub engie_pos: Position,
    pub animation: Animation,
    pub direction: Direction,
    pub speed: Speed,
    pub mood: Mood,
    drag_locked: bool,

    // Heightened engagement mode
    pub grok_active: bool,
    pub grok_ends_at: Option<DateTime<Utc>>,

    // Progress
    pub applied_count: usize,
    pub reviewed_total: usize,
    pub last_interaction: Option<Interaction>,
}

impl Default for EngieState {
    fn default() -> Self {
        Self::with_notification_limit(DEFAULT_MAX_IDEA_NOTIFICATIONS)
    }
}

impl EngieState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notification_limit(max_idea_notifications: usize) -> Self {
        Self {
            version: 0,
            is_scanning: false,
            internal_suggestions: Vec::new(),
            external_suggestions: Vec::new(),
            current_suggestion_index: 0,
            tone_analysis: None,
            page_tone_analysis: None,
            is_ideating: false,
            ideation_message: None,
            encouragement_message: None,
            chat_open: false,
            chat_loading: false,
            active_tab: ActiveTab::default(),
            chat_history: Vec::new(),
            idea_notifications: Vec::new(),
            unread_ideas: 0,
            idea_cue: false,
            max_idea_notifications: max_idea_notifications.max(1),
            engie_pos: Position::default(),
            animation: Animation::default(),
            direction: Direction::default(),
            speed: Speed::default(),
            mood: Mood::default(),
            drag_locked: false,
            grok_active: false,
            grok_ends_at: None,
            applied_count: 0,
            reviewed_total: 0,
            last_interaction: None,
        }
    }

    /// Pure reduction: State + Delta -> Mutated State.
    /// Invariants are re-established before returning, so no delta can leave them broken.
    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::SetScanning(scanning) => {
                self.is_scanning = scanning;
                let cue = if scanning { AnimationCue::WorkStarted } else { AnimationCue::WorkFinished };
                self.animation = AnimationGraph::apply(self.animation, cue);
            }
            StateDelta::ScanCompleted { suggestions, tone } => {
                self.is_scanning = false;
                self.animation = AnimationGraph::apply(self.animation, AnimationCue::WorkFinished);
                self.reviewed_total += suggestions.len();
                self.internal_suggestions = suggestions;
                self.current_suggestion_index = 0;
                self.tone_analysis = tone;
            }
            StateDelta::SetInternalSuggestions(suggestions) => {
                self.internal_suggestions = suggestions;
            }
            StateDelta::SetExternalSuggestions(suggestions) => {
                self.external_suggestions = suggestions;
            }
            StateDelta::DismissSuggestion(id) => {
                if let Some(pos) = self.internal_suggestions.iter().position(|s| s.id == id) {
                    self.internal_suggestions.remove(pos);
                    if pos < self.current_suggestion_index {
                        self.current_suggestion_index -= 1;
                    }
                } else if let Some(pos) = self.external_suggestions.iter().position(|s| s.id == id) {
                    self.external_suggestions.remove(pos);
                    if self.internal_suggestions.is_empty() && pos < self.current_suggestion_index {
                        self.current_suggestion_index -= 1;
                    }
                }
                if self.active_suggestions().is_empty() {
                    self.current_suggestion_index = 0;
                    self.ideation_message = None;
                    self.encouragement_message = None;
                }
            }
            StateDelta::SetSuggestionIndex(index) => {
                self.current_suggestion_index = index;
            }
            StateDelta::ClearSuggestions => {
                self.internal_suggestions.clear();
                self.external_suggestions.clear();
                self.current_suggestion_index = 0;
            }
            StateDelta::SetToneAnalysis(tone) => {
                self.tone_analysis = tone;
            }
            StateDelta::SetPageToneAnalysis(tone) => {
                self.page_tone_analysis = tone;
            }
            StateDelta::SetIdeating(ideating) => {
                self.is_ideating = ideating;
                let cue = if ideating { AnimationCue::WorkStarted } else { AnimationCue::WorkFinished };
                self.animation = AnimationGraph::apply(self.animation, cue);
            }
            StateDelta::SetIdeationMessage(message) => {
                if message.is_some() {
                    self.encouragement_message = None;
                } else {
                    self.animation = AnimationGraph::apply(self.animation, AnimationCue::Settle);
                }
                self.ideation_message = message;
            }
            StateDelta::SetEncouragement(message) => {
                if message.is_some() {
                    self.ideation_message = None;
                }
                self.encouragement_message = message;
            }
            StateDelta::SetChatOpen(open) => {
                self.chat_open = open;
                if !open {
                    self.animation = AnimationGraph::apply(self.animation, AnimationCue::Settle);
                }
            }
            StateDelta::SetChatLoading(loading) => {
                self.chat_loading = loading;
            }
            StateDelta::SetActiveTab(tab) => {
                self.active_tab = tab;
            }
            StateDelta::AppendChatMessage(message) => {
                self.chat_history.push(message);
            }
            StateDelta::ResetChat => {
                self.chat_history.clear();
                self.chat_open = false;
                self.chat_loading = false;
                self.ideation_message = None;
                self.encouragement_message = None;
                self.animation = AnimationGraph::apply(self.animation, AnimationCue::Settle);
            }
            StateDelta::PushIdeaNotification(notification) => {
                self.idea_notifications.push(notification);
            }
            StateDelta::MarkIdeasRead => {
                for n in &mut self.idea_notifications {
                    n.read = true;
                }
            }
            StateDelta::SetIdeaCue(on) => {
                self.idea_cue = on;
            }
            StateDelta::SetEngiePos(pos) => {
                self.engie_pos = pos;
            }
            StateDelta::SetMotion { direction, speed } => {
                self.direction = direction;
                self.speed = speed;
            }
            StateDelta::Animate(cue) => {
                self.animation = AnimationGraph::apply(self.animation, cue);
            }
            StateDelta::SetMood(mood) => {
                self.mood = mood;
            }
            StateDelta::SetGrokMode { active, ends_at } => {
                self.grok_active = active;
                self.grok_ends_at = if active { ends_at } else { None };
            }
            StateDelta::RecordInteraction(interaction) => {
                if interaction == Interaction::AppliedSuggestion {
                    self.applied_count += 1;
                }
                self.last_interaction = Some(interaction);
            }
        }

        self.enforce_invariants();
    }

    fn enforce_invariants(&mut self) {
        let active_len = self.active_suggestions().len();

        // Surfaced suggestions are never hidden behind a stale proactive message.
        if active_len > 0 {
            self.ideation_message = None;
            self.encouragement_message = None;
        }

        self.current_suggestion_index = if active_len == 0 {
            0
        } else {
            self.current_suggestion_index.min(active_len - 1)
        };

        self.drag_locked = !self.internal_suggestions.is_empty() || !self.external_suggestions.is_empty();

        if self.idea_notifications.len() > self.max_idea_notifications {
            let excess = self.idea_notifications.len() - self.max_idea_notifications;
            self.idea_notifications.drain(..excess);
        }
        self.unread_ideas = self.idea_notifications.iter().filter(|n| !n.read).count();
    }

    // Read-only accessors for views and the controller

    /// Internal suggestions take precedence; external ones show when no scan result is present.
    pub fn active_suggestions(&self) -> &[Suggestion] {
        if self.internal_suggestions.is_empty() {
            &self.external_suggestions
        } else {
            &self.internal_suggestions
        }
    }

    pub fn internal_suggestions(&self) -> &[Suggestion] {
        &self.internal_suggestions
    }

    pub fn external_suggestions(&self) -> &[Suggestion] {
        &self.external_suggestions
    }

    pub fn current_suggestion_index(&self) -> usize {
        self.current_suggestion_index
    }

    pub fn current_suggestion(&self) -> Option<&Suggestion> {
        self.active_suggestions().get(self.current_suggestion_index)
    }

    pub fn ideation_message(&self) -> Option<&str> {
        self.ideation_message.as_deref()
    }

    pub fn encouragement_message(&self) -> Option<&str> {
        self.encouragement_message.as_deref()
    }

    pub fn chat_history(&self) -> &[ChatMessage] {
        &self.chat_history
    }

    pub fn idea_notifications(&self) -> &[IdeaNotification] {
        &self.idea_notifications
    }

    pub fn unread_ideas(&self) -> usize {
        self.unread_ideas
    }

    pub fn drag_locked(&self) -> bool {
        self.drag_locked
    }

    pub fn primary_display(&self) -> PrimaryDisplay {
        if !self.active_suggestions().is_empty() {
            PrimaryDisplay::Suggestions
        } else if self.ideation_message.is_some() {
            PrimaryDisplay::Ideation
        } else if self.encouragement_message.is_some() {
            PrimaryDisplay::Encouragement
        } else {
            PrimaryDisplay::Nothing
        }
    }

    /// True when something is showing (or being produced) that the user should act on.
    /// The inactivity timer only runs while this is false.
    pub fn has_actionable_content(&self) -> bool {
        !self.active_suggestions().is_empty()
            || self.ideation_message.is_some()
            || self.encouragement_message.is_some()
            || self.is_ideating
            || (self.chat_open && !self.chat_history.is_empty())
    }
}
