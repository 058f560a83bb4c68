mod common;

use std::sync::atomic::Ordering;

use common::{advance, fix, Harness, MockApi};
use engie::kernel::presence::{ActiveTab, Animation, Mood};
use engie::kernel::state::PrimaryDisplay;
use engie::kernel::types::Role;

const STORY: &str = "The lighthouse keeper found a letter wedged between the stones.";

#[tokio::test(start_paused = true)]
async fn test_inactivity_nudges_with_an_idea_notification() {
    let h = Harness::new(STORY);
    assert!(h.controller.active_timers().inactivity, "Armed while nothing is showing");

    advance(29_000).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 0);

    advance(1_500).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 1);
    let state = h.controller.state();
    assert_eq!(state.idea_notifications().len(), 1);
    assert_eq!(state.unread_ideas(), 1);
    assert!(state.idea_cue);
    assert!(!state.is_ideating);
    assert!(state.ideation_message().is_none(), "Automatic ideas go to the notification list");
    assert!(h.api.last_prompt().unwrap().contains("paused for a while"));

    advance(3_000).await;
    assert!(!h.controller.state().idea_cue, "Cue clears on its own");

    // The next quiet period gets the continuation prompt.
    advance(30_000).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 2);
    assert!(h.api.last_prompt().unwrap().contains("paused again"));
    assert_eq!(h.controller.state().unread_ideas(), 2);

    h.controller.mark_ideas_read();
    assert_eq!(h.controller.state().unread_ideas(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_visible_suggestions_hold_off_inactivity() {
    let h = Harness::new(STORY);
    h.api.respond_with("lighthouse", vec![fix("wedged", "stuck")]);
    h.controller.scan_for_suggestions().await;

    assert!(!h.controller.active_timers().inactivity);
    advance(45_000).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_notifications_are_bounded() {
    let mut config = engie::EngieConfig::default();
    config.thresholds.max_idea_notifications = 2;
    let h = Harness::with_config(STORY, config);

    // Nudges land at 30s, 62.5s and 95s; each idea cue restarts the countdown.
    advance(100_000).await;
    let state = h.controller.state();
    assert_eq!(MockApi::calls(&h.api.chat_calls), 3);
    assert_eq!(state.idea_notifications().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clicking_an_idle_companion_asks_for_ideas() {
    let h = Harness::new(STORY);

    h.controller.on_companion_clicked().await;

    let state = h.controller.state();
    assert!(state.chat_open);
    assert_eq!(state.active_tab, ActiveTab::Chat);
    assert_eq!(state.primary_display(), PrimaryDisplay::Ideation);
    assert_eq!(state.ideation_message(), Some("What if the hero doubts the map?"));
    assert_eq!(state.mood, Mood::Excited);
    assert!(h.api.last_prompt().unwrap().contains("brainstorming"));

    h.controller.on_companion_clicked().await;
    assert!(!h.controller.state().chat_open);
    assert_eq!(MockApi::calls(&h.api.chat_calls), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ideation_needs_enough_page_text() {
    let mut config = engie::EngieConfig::default();
    config.thresholds.min_ideation_chars = 40;
    let h = Harness::with_config("Short.", config);
    h.controller.trigger_ideation(true).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 0);
    assert!(!h.controller.state().is_ideating);
}

#[tokio::test(start_paused = true)]
async fn test_chat_round_trip_and_dismiss() {
    let h = Harness::new(STORY);
    h.api.set_chat_reply("Try opening with the letter itself.");

    h.controller.send_chat_message("  How should I start?  ").await;

    let state = h.controller.state();
    let history = state.chat_history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "How should I start?");
    assert_eq!(history[1].role, Role::Assistant);
    assert!(!state.chat_loading);
    assert!(state.chat_open);

    h.controller.send_chat_message("   ").await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 1, "Blank messages are ignored");

    h.controller.dismiss_chat();
    let state = h.controller.state();
    assert!(state.chat_history().is_empty());
    assert!(!state.chat_open);
}

#[tokio::test(start_paused = true)]
async fn test_failed_chat_keeps_the_user_message() {
    let h = Harness::new(STORY);
    h.api.fail.store(true, Ordering::SeqCst);

    h.controller.send_chat_message("Anyone there?").await;

    let state = h.controller.state();
    assert_eq!(state.chat_history().len(), 1);
    assert!(!state.chat_loading);
}

#[tokio::test(start_paused = true)]
async fn test_encouragement_is_not_repeated_for_the_same_tone() {
    let h = Harness::new(STORY);

    h.controller.analyze_page_tone().await;
    let state = h.controller.state();
    assert_eq!(state.page_tone_analysis.as_ref().unwrap().overall_tone, "Optimistic");
    assert_eq!(state.primary_display(), PrimaryDisplay::Encouragement);
    assert_eq!(state.mood, Mood::Happy);

    h.controller.analyze_page_tone().await;
    assert_eq!(MockApi::calls(&h.api.tone_calls), 2);
    assert_eq!(MockApi::calls(&h.api.encouragement_calls), 1);

    h.api.set_tone("Anxious");
    h.controller.analyze_page_tone().await;
    assert_eq!(MockApi::calls(&h.api.encouragement_calls), 2);
}

#[tokio::test(start_paused = true)]
async fn test_encouragement_waits_while_suggestions_show() {
    let h = Harness::new(STORY);
    h.api.respond_with("lighthouse", vec![fix("wedged", "stuck")]);
    h.controller.scan_for_suggestions().await;

    h.controller.analyze_page_tone().await;

    assert_eq!(MockApi::calls(&h.api.encouragement_calls), 0);
    assert_eq!(h.controller.state().primary_display(), PrimaryDisplay::Suggestions);
}

#[tokio::test(start_paused = true)]
async fn test_page_tone_does_not_replace_a_requested_idea() {
    let h = Harness::new(STORY);
    h.controller.on_companion_clicked().await;

    h.controller.analyze_page_tone().await;

    let state = h.controller.state();
    assert_eq!(state.primary_display(), PrimaryDisplay::Ideation);
    assert_eq!(state.ideation_message(), Some("What if the hero doubts the map?"));
    assert_eq!(state.page_tone_analysis.as_ref().unwrap().overall_tone, "Optimistic");
    assert_eq!(MockApi::calls(&h.api.encouragement_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_excited_pose_settles_when_the_chat_closes() {
    let h = Harness::new(STORY);

    h.controller.on_companion_clicked().await;
    assert_eq!(h.controller.state().animation, Animation::Excited);

    h.controller.close_chat();
    assert_eq!(h.controller.state().animation, Animation::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_steady_activity_keeps_pushing_the_nudge_back() {
    let h = Harness::new(STORY);
    let store = h.controller.store().clone();

    for step in 0..20 {
        store.set_engie_pos(engie::kernel::types::Position::new(10.0 + step as f32, 10.0));
        advance(1_000).await;
    }
    assert!(h.controller.active_timers().inactivity);

    // Last update at 19s, so the nudge is due at 49s.
    advance(28_000).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 0, "Countdown restarted at the last update");

    advance(1_500).await;
    assert_eq!(MockApi::calls(&h.api.chat_calls), 1);
}
