//! Mood inference. Pure mappings from analysis results to a companion mood.

use super::presence::Mood;

const HAPPY_WORDS: &[&str] = &["positive", "optimistic", "joyful", "cheerful", "friendly", "warm"];
const EXCITED_WORDS: &[&str] = &["enthusiastic", "energetic", "excited", "passionate", "exuberant"];
const CONCERNED_WORDS: &[&str] = &["negative", "critical", "angry", "sad", "frustrated", "pessimistic", "hostile"];
const THOUGHTFUL_WORDS: &[&str] = &["analytical", "technical", "formal", "academic", "reflective"];

/// Most recent thing the user did with the companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    AppliedSuggestion,
    DismissedSuggestion,
    SentChat,
    RequestedIdeas,
}

pub fn mood_from_tone(tone: &str) -> Mood {
    let tone = tone.to_lowercase();
    let matches = |words: &[&str]| words.iter().any(|w| tone.contains(w));

    if matches(HAPPY_WORDS) {
        Mood::Happy
    } else if matches(EXCITED_WORDS) {
        Mood::Excited
    } else if matches(CONCERNED_WORDS) {
        Mood::Concerned
    } else if matches(THOUGHTFUL_WORDS) {
        Mood::Thoughtful
    } else {
        Mood::Neutral
    }
}

/// Errors per 100 words.
pub fn suggestion_density(suggestions: usize, text: &str) -> f32 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0.0;
    }
    suggestions as f32 * 100.0 / words as f32
}

pub fn mood_from_density(errors_per_100_words: f32) -> Mood {
    if errors_per_100_words < 0.5 {
        Mood::Happy
    } else if errors_per_100_words < 2.0 {
        Mood::Neutral
    } else if errors_per_100_words < 5.0 {
        Mood::Thoughtful
    } else {
        Mood::Concerned
    }
}

pub fn mood_from_progress(applied: usize, total: usize) -> Mood {
    if total == 0 {
        return Mood::Neutral;
    }
    let ratio = applied as f32 / total as f32;
    if ratio >= 0.9 {
        Mood::Excited
    } else if ratio >= 0.5 {
        Mood::Happy
    } else if ratio >= 0.2 {
        Mood::Thoughtful
    } else if ratio > 0.0 {
        Mood::Neutral
    } else {
        Mood::Concerned
    }
}

pub fn mood_from_interaction(interaction: Interaction) -> Mood {
    match interaction {
        Interaction::AppliedSuggestion => Mood::Happy,
        Interaction::DismissedSuggestion => Mood::Thoughtful,
        Interaction::SentChat => Mood::Neutral,
        Interaction::RequestedIdeas => Mood::Excited,
    }
}
