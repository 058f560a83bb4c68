use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, sleep_until, Instant, MissedTickBehavior};
use tracing::debug;

use super::store::lock;

/// Returned by a repeating step to say whether it wants another tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

#[derive(Default)]
struct SlotState {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// A named timer slot that holds at most one live task.
///
/// Scheduling into an occupied slot aborts the previous task first, so two
/// timers can never drive the same concern at once.
#[derive(Clone)]
pub struct TaskSlot {
    name: &'static str,
    runtime: Handle,
    state: Arc<Mutex<SlotState>>,
}

impl TaskSlot {
    pub fn new(name: &'static str, runtime: Handle) -> Self {
        Self {
            name,
            runtime,
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs `job` once after `delay`. The slot is released right before `job`
    /// starts, so the job itself may re-arm or cancel this slot.
    pub fn schedule_once<F>(&self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = lock(&self.state);
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        let state = self.state.clone();
        let name = self.name;

        slot.task = Some(self.runtime.spawn(async move {
            sleep(delay).await;
            release(&state, generation);
            debug!("Timer '{}' fired", name);
            job.await;
        }));
    }

    /// Calls `step` with the frame number (from 1) every `period` until it
    /// returns [`TickControl::Stop`] or the slot is cancelled.
    pub fn schedule_repeating<F>(&self, period: Duration, mut step: F)
    where
        F: FnMut(u64) -> TickControl + Send + 'static,
    {
        let mut slot = lock(&self.state);
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        let state = self.state.clone();

        slot.task = Some(self.runtime.spawn(async move {
            let mut cadence = interval(period);
            cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick of an interval completes immediately.
            cadence.tick().await;

            let mut frame = 0u64;
            loop {
                cadence.tick().await;
                frame += 1;
                if step(frame) == TickControl::Stop {
                    release(&state, generation);
                    break;
                }
            }
        }));
    }

    /// Aborts the live task, if any. Safe to call repeatedly.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.state);
        slot.generation += 1;
        match slot.task.take() {
            Some(task) => {
                task.abort();
                debug!("Timer '{}' cancelled", self.name);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// Drops the slot's handle if it still belongs to `generation`.
fn release(state: &Mutex<SlotState>, generation: u64) {
    let mut slot = lock(state);
    if slot.generation == generation {
        slot.task = None;
    }
}

#[derive(Default)]
struct DeadlineState {
    generation: u64,
    deadline: Option<watch::Sender<Instant>>,
    task: Option<JoinHandle<()>>,
}

/// A restartable one-shot timer.
///
/// Arming it while it is already counting only moves the deadline of the
/// live task; a new task is spawned only when none is pending.
#[derive(Clone)]
pub struct DeadlineTimer {
    name: &'static str,
    runtime: Handle,
    state: Arc<Mutex<DeadlineState>>,
}

impl DeadlineTimer {
    pub fn new(name: &'static str, runtime: Handle) -> Self {
        Self {
            name,
            runtime,
            state: Arc::new(Mutex::new(DeadlineState::default())),
        }
    }

    /// Fires `job` once `delay` from now. If a countdown is pending its
    /// deadline moves and `job` is dropped in favour of the pending one.
    pub fn arm<F, Fut>(&self, delay: Duration, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let mut slot = lock(&self.state);
        if let Some(sender) = &slot.deadline {
            if sender.send(deadline).is_ok() {
                return;
            }
        }
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }

        slot.generation += 1;
        let generation = slot.generation;
        let (sender, mut receiver) = watch::channel(deadline);
        slot.deadline = Some(sender);
        let state = self.state.clone();
        let name = self.name;

        slot.task = Some(self.runtime.spawn(async move {
            let timer = sleep_until(deadline);
            tokio::pin!(timer);
            loop {
                tokio::select! {
                    _ = &mut timer => {}
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let next = *receiver.borrow_and_update();
                        timer.as_mut().reset(next);
                        continue;
                    }
                }
                // Re-check under the lock so a concurrent arm() is never lost.
                let latest = {
                    let mut slot = lock(&state);
                    let latest = *receiver.borrow_and_update();
                    if latest <= Instant::now() && slot.generation == generation {
                        slot.deadline = None;
                        slot.task = None;
                    }
                    latest
                };
                if latest > Instant::now() {
                    timer.as_mut().reset(latest);
                    continue;
                }
                break;
            }
            debug!("Timer '{}' fired", name);
            job().await;
        }));
    }

    /// Drops any pending countdown. Safe to call repeatedly.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.state);
        slot.generation += 1;
        slot.deadline = None;
        match slot.task.take() {
            Some(task) => {
                task.abort();
                debug!("Timer '{}' cancelled", self.name);
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.state)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_pending_job() {
        let slot = TaskSlot::new("test", Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let f = fired.clone();
            slot.schedule_once(Duration::from_millis(100), async move {
                f.fetch_add(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(30)).await;
        }
        sleep(Duration::from_millis(500)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let slot = TaskSlot::new("test", Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        slot.schedule_once(Duration::from_secs(1), async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        assert!(slot.is_active());
        assert!(slot.cancel());
        assert!(!slot.cancel());
        sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_stops_itself() {
        let slot = TaskSlot::new("stepper", Handle::current());
        let ticks = Arc::new(AtomicUsize::new(0));
        let t = ticks.clone();
        slot.schedule_repeating(Duration::from_millis(50), move |frame| {
            t.fetch_add(1, Ordering::SeqCst);
            if frame >= 4 {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });

        sleep(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
        assert!(!slot.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_moves_the_deadline_without_respawning() {
        let timer = DeadlineTimer::new("idle", Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let f = fired.clone();
            timer.arm(Duration::from_millis(100), move || async move {
                f.fetch_add(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(60)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0, "Every arm pushed the deadline out");
        assert_eq!(lock(&timer.state).generation, 1, "One task served every arm");

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_timer_can_be_rearmed_from_its_own_job() {
        let timer = DeadlineTimer::new("idle", Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));
        let (f, t) = (fired.clone(), timer.clone());
        timer.arm(Duration::from_millis(100), move || async move {
            f.fetch_add(1, Ordering::SeqCst);
            let again = f.clone();
            t.arm(Duration::from_millis(100), move || async move {
                again.fetch_add(1, Ordering::SeqCst);
            });
        });

        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timer.is_active());

        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_deadline_never_fires() {
        let timer = DeadlineTimer::new("idle", Handle::current());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timer.arm(Duration::from_millis(100), move || async move {
            f.fetch_add(1, Ordering::SeqCst);
        });

        assert!(timer.cancel());
        assert!(!timer.cancel());
        sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!timer.is_active());
    }
}
