use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};

use super::presence::{ActiveTab, Mood};
use super::state::{EngieState, StateDelta};
use super::types::{ChatMessage, Position, Suggestion, ToneAnalysis};

pub type Listener = Arc<dyn Fn(&EngieState) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct StoreInner {
    state: Mutex<Arc<EngieState>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
}

/// Single source of truth for the companion. Cheap to clone; every clone
/// shares the same aggregate and subscriber list.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

/// Handle returned by [`StateStore::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            lock(&store.listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(EngieState::default())
    }
}

impl StateStore {
    pub fn new(initial: EngieState) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Immutable snapshot of the current aggregate.
    pub fn get_state(&self) -> Arc<EngieState> {
        lock(&self.inner.state).clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EngieState) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }

    /// Reduces one delta and notifies every listener before returning.
    /// Locks are released before listeners run, so a listener may dispatch again.
    pub fn dispatch(&self, delta: StateDelta) -> Arc<EngieState> {
        let snapshot = {
            let mut guard = lock(&self.inner.state);
            let mut next = EngieState::clone(&guard);
            next.reduce(delta);
            let next = Arc::new(next);
            *guard = next.clone();
            next
        };

        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }

        snapshot
    }

    // Named setters. Each one is a single dispatch.

    pub fn set_scanning(&self, scanning: bool) {
        self.dispatch(StateDelta::SetScanning(scanning));
    }

    pub fn set_internal_suggestions(&self, suggestions: Vec<Suggestion>) {
        self.dispatch(StateDelta::SetInternalSuggestions(suggestions));
    }

    pub fn set_external_suggestions(&self, suggestions: Vec<Suggestion>) {
        self.dispatch(StateDelta::SetExternalSuggestions(suggestions));
    }

    pub fn set_current_suggestion_index(&self, index: usize) {
        self.dispatch(StateDelta::SetSuggestionIndex(index));
    }

    pub fn set_tone_analysis(&self, tone: Option<ToneAnalysis>) {
        self.dispatch(StateDelta::SetToneAnalysis(tone));
    }

    pub fn set_page_tone_analysis(&self, tone: Option<ToneAnalysis>) {
        self.dispatch(StateDelta::SetPageToneAnalysis(tone));
    }

    pub fn set_ideation_message(&self, message: Option<String>) {
        self.dispatch(StateDelta::SetIdeationMessage(message));
    }

    pub fn set_encouragement_message(&self, message: Option<String>) {
        self.dispatch(StateDelta::SetEncouragement(message));
    }

    pub fn set_chat_open(&self, open: bool) {
        self.dispatch(StateDelta::SetChatOpen(open));
    }

    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.dispatch(StateDelta::SetActiveTab(tab));
    }

    pub fn append_chat_message(&self, message: ChatMessage) {
        self.dispatch(StateDelta::AppendChatMessage(message));
    }

    pub fn set_engie_pos(&self, pos: Position) {
        self.dispatch(StateDelta::SetEngiePos(pos));
    }

    pub fn set_mood(&self, mood: Mood) {
        self.dispatch(StateDelta::SetMood(mood));
    }

    pub fn set_grok_mode(&self, active: bool, ends_at: Option<DateTime<Utc>>) {
        self.dispatch(StateDelta::SetGrokMode { active, ends_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_run_once_per_dispatch() {
        let store = StateStore::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _sub = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        store.set_scanning(true);
        store.set_scanning(false);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_sees_the_mutation_that_triggered_it() {
        let store = StateStore::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = store.subscribe(move |state| {
            lock(&s).push(state.chat_open);
        });

        store.set_chat_open(true);
        store.set_chat_open(false);
        assert_eq!(*lock(&seen), vec![true, false]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let store = StateStore::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let sub = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        store.set_scanning(true);
        sub.unsubscribe();
        store.set_scanning(false);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn listener_may_dispatch_reentrantly() {
        let store = StateStore::default();
        let inner = store.clone();
        let _sub = store.subscribe(move |state| {
            if state.chat_open && state.active_tab != ActiveTab::Chat {
                inner.set_active_tab(ActiveTab::Chat);
            }
        });

        store.set_chat_open(true);
        let state = store.get_state();
        assert!(state.chat_open);
        assert_eq!(state.active_tab, ActiveTab::Chat);
    }

    #[test]
    fn snapshots_are_immutable() {
        let store = StateStore::default();
        let before = store.get_state();
        store.set_mood(Mood::Excited);
        assert_eq!(before.mood, Mood::Neutral);
        assert_eq!(store.get_state().mood, Mood::Excited);
    }
}
