use std::sync::Arc;

use tracing::debug;

use crate::config::PositionConfig;
use crate::page::anchor::{AnchorResolver, AnchorTarget};
use crate::page::snapshot::{PageSource, PageView, Rect, Viewport};

use super::presence::{AnimationCue, Direction, Speed};
use super::scheduler::{TaskSlot, TickControl};
use super::state::StateDelta;
use super::store::StateStore;
use super::types::{Position, Suggestion};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Moving(Position),
    Arrived(Position),
}

/// Moves `fraction` of the remaining distance. Within `epsilon` it snaps to the target.
pub fn step_toward(current: Position, target: Position, fraction: f32, epsilon: f32) -> Step {
    if current.distance_to(target) <= epsilon {
        return Step::Arrived(target);
    }
    let fraction = fraction.clamp(0.01, 1.0);
    let next = Position::new(
        current.x + (target.x - current.x) * fraction,
        current.y + (target.y - current.y) * fraction,
    );
    if next.distance_to(target) <= epsilon {
        Step::Arrived(target)
    } else {
        Step::Moving(next)
    }
}

/// Where the companion rests when it has nothing to point at: the bottom-right corner.
pub fn rest_position(viewport: Viewport, config: &PositionConfig) -> Position {
    clamp_to_viewport(
        Position::new(
            viewport.width - config.companion_size - config.margin,
            viewport.height - config.companion_size - config.margin,
        ),
        viewport,
        config,
    )
}

/// Beside the anchor: to its right, or to its left when the right side would overflow.
pub fn position_near(anchor: Rect, viewport: Viewport, config: &PositionConfig) -> Position {
    let size = config.companion_size;
    let margin = config.margin;
    let right_side = anchor.right() + margin;
    let x = if right_side + size + margin <= viewport.width {
        right_side
    } else {
        anchor.x - size - margin
    };
    clamp_to_viewport(Position::new(x, anchor.y), viewport, config)
}

pub fn clamp_to_viewport(pos: Position, viewport: Viewport, config: &PositionConfig) -> Position {
    let max_x = (viewport.width - config.companion_size - config.margin).max(config.margin);
    let max_y = (viewport.height - config.companion_size - config.margin).max(config.margin);
    Position::new(pos.x.clamp(config.margin, max_x), pos.y.clamp(config.margin, max_y))
}

/// Decides where the companion should stand and walks it there, one stepper at a time.
#[derive(Clone)]
pub struct PositionPlanner {
    store: StateStore,
    page: Arc<dyn PageSource>,
    resolver: Arc<AnchorResolver>,
    stepper: TaskSlot,
    config: PositionConfig,
    tick: std::time::Duration,
}

impl PositionPlanner {
    pub fn new(
        store: StateStore,
        page: Arc<dyn PageSource>,
        resolver: AnchorResolver,
        stepper: TaskSlot,
        config: PositionConfig,
        tick: std::time::Duration,
    ) -> Self {
        Self {
            store,
            page,
            resolver: Arc::new(resolver),
            stepper,
            config,
            tick,
        }
    }

    /// Target coordinate for a semantic anchor; the rest position if nothing resolves.
    pub fn plan(&self, target: &AnchorTarget) -> Position {
        let snapshot = self.page.snapshot();
        let view = PageView::parse(&snapshot);
        match self.resolver.resolve(target, &view) {
            Some(anchor) => position_near(anchor.rect, view.viewport, &self.config),
            None => rest_position(view.viewport, &self.config),
        }
    }

    pub fn move_to_optimal_position(&self, target: AnchorTarget) {
        let destination = self.plan(&target);
        self.animate_to(destination);
    }

    pub fn move_engie_to_suggestion(&self, suggestion: &Suggestion) {
        self.move_to_optimal_position(AnchorTarget::SuggestionText(suggestion.original.clone()));
    }

    pub fn reset_engie_position(&self) {
        let viewport = self.page.snapshot().viewport;
        self.animate_to(rest_position(viewport, &self.config));
    }

    pub fn is_moving(&self) -> bool {
        self.stepper.is_active()
    }

    pub fn stop(&self) {
        if self.stepper.cancel() {
            self.store.dispatch(StateDelta::Animate(AnimationCue::Arrived));
        }
    }

    /// Starts the stepper toward `destination`, replacing any walk in progress.
    pub fn animate_to(&self, destination: Position) {
        let start = self.store.get_state().engie_pos;
        let distance = start.distance_to(destination);
        if distance <= self.config.epsilon {
            self.stop();
            return;
        }

        debug!("Walking {:.0}px to ({:.0}, {:.0})", distance, destination.x, destination.y);
        let direction = if destination.x < start.x { Direction::Left } else { Direction::Right };
        self.store.dispatch(StateDelta::SetMotion {
            direction,
            speed: Speed::for_distance(distance),
        });
        self.store.dispatch(StateDelta::Animate(AnimationCue::StartMove));

        let store = self.store.clone();
        let fraction = self.config.step_fraction;
        let epsilon = self.config.epsilon;
        let max_ticks = u64::from(self.config.max_ticks);

        self.stepper.schedule_repeating(self.tick, move |frame| {
            let current = store.get_state().engie_pos;
            let step = if frame >= max_ticks {
                Step::Arrived(destination)
            } else {
                step_toward(current, destination, fraction, epsilon)
            };
            match step {
                Step::Moving(next) => {
                    store.dispatch(StateDelta::SetEngiePos(next));
                    TickControl::Continue
                }
                Step::Arrived(end) => {
                    store.dispatch(StateDelta::SetEngiePos(end));
                    store.dispatch(StateDelta::Animate(AnimationCue::Arrived));
                    TickControl::Stop
                }
            }
        });
    }
}
