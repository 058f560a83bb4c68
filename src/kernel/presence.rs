use serde::{Deserialize, Serialize};

/// What the companion's body is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Animation {
    /// Resting, nothing in flight.
    #[default]
    Idle,
    /// Moving toward a target position.
    Walking,
    /// An analysis or ideation request is in flight.
    Thinking,
    /// Something worth the user's attention just arrived.
    Excited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Direction {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Speed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl Speed {
    /// Longer trips are walked faster.
    pub fn for_distance(distance: f32) -> Self {
        if distance > 600.0 {
            Speed::Fast
        } else if distance > 150.0 {
            Speed::Normal
        } else {
            Speed::Slow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Mood {
    Happy,
    Excited,
    Concerned,
    Thoughtful,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ActiveTab {
    #[default]
    Suggestions,
    Tone,
    Chat,
    Ideas,
}

/// Events that request an animation change.
/// These are REQUESTS; the graph decides whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationCue {
    StartMove,
    Arrived,
    WorkStarted,
    WorkFinished,
    Attention,
    Settle,
}

pub struct AnimationGraph;

impl AnimationGraph {
    /// Pure function: (Current Animation, Cue) -> New Animation.
    /// Returns None when the cue does not apply in the current animation.
    pub fn transition(current: Animation, cue: AnimationCue) -> Option<Animation> {
        use Animation::*;
        use AnimationCue::*;

        match (current, cue) {
            // Movement always wins; the body can walk out of any pose.
            (Walking, StartMove) => None,
            (_, StartMove) => Some(Walking),
            (Walking, Arrived) => Some(Idle),

            // Thinking does not interrupt a walk.
            (Idle | Excited, WorkStarted) => Some(Thinking),
            (Thinking, WorkFinished) => Some(Idle),

            (Idle | Thinking, Attention) => Some(Excited),
            (Excited, Settle) => Some(Idle),

            _ => None,
        }
    }

    /// Applies a cue, keeping the current animation when the cue is ignored.
    pub fn apply(current: Animation, cue: AnimationCue) -> Animation {
        Self::transition(current, cue).unwrap_or(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_cycle() {
        let walking = AnimationGraph::transition(Animation::Idle, AnimationCue::StartMove);
        assert_eq!(walking, Some(Animation::Walking));
        let idle = AnimationGraph::transition(Animation::Walking, AnimationCue::Arrived);
        assert_eq!(idle, Some(Animation::Idle));
    }

    #[test]
    fn arrival_without_walk_is_rejected() {
        assert!(AnimationGraph::transition(Animation::Idle, AnimationCue::Arrived).is_none());
        assert!(AnimationGraph::transition(Animation::Thinking, AnimationCue::Arrived).is_none());
    }

    #[test]
    fn thinking_does_not_interrupt_walking() {
        assert_eq!(
            AnimationGraph::apply(Animation::Walking, AnimationCue::WorkStarted),
            Animation::Walking
        );
    }

    #[test]
    fn speed_buckets() {
        assert_eq!(Speed::for_distance(20.0), Speed::Slow);
        assert_eq!(Speed::for_distance(300.0), Speed::Normal);
        assert_eq!(Speed::for_distance(900.0), Speed::Fast);
    }
}
