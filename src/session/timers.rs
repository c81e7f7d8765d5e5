use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::models::ScreenState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// No interaction for the idle period while past the welcome screen.
    Idle,
    /// The success screen has been shown long enough.
    SuccessDisplay,
}

/// Delivered when a timer expires. `generation` identifies the arming that
/// produced it so a late event from a cancelled timer can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub kind: TimerKind,
    pub generation: u64,
}

// Aborts the task when dropped, so no callback outlives its owner
struct ScheduledTask {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// The idle and success-display timers of one kiosk session. Both are
/// single-shot; re-arming replaces the previous task. Must be used from
/// within a tokio runtime.
pub struct SessionTimers {
    idle_after: Duration,
    success_after: Duration,
    events: mpsc::UnboundedSender<TimerEvent>,
    next_generation: u64,
    idle: Option<ScheduledTask>,
    success: Option<ScheduledTask>,
}

impl SessionTimers {
    pub fn new(
        idle_after: Duration,
        success_after: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let timers = SessionTimers {
            idle_after,
            success_after,
            events,
            next_generation: 0,
            idle: None,
            success: None,
        };
        (timers, receiver)
    }

    /// Call on every user interaction. Restarts the idle countdown while past
    /// the welcome screen.
    pub fn record_interaction(&mut self, state: ScreenState) {
        if state.is_past_welcome() {
            self.idle = Some(self.schedule(TimerKind::Idle, self.idle_after));
        } else {
            self.idle = None;
        }
    }

    /// Call whenever the active screen changes. Leaving a screen cancels the
    /// timers it owned.
    pub fn on_enter(&mut self, state: ScreenState) {
        match state {
            ScreenState::Welcome => self.cancel_all(),
            ScreenState::Success => {
                self.success = Some(self.schedule(TimerKind::SuccessDisplay, self.success_after));
                self.record_interaction(state);
            }
            _ => {
                self.success = None;
                self.record_interaction(state);
            }
        }
    }

    /// Whether `event` comes from the currently armed timer of its kind.
    pub fn is_current(&self, event: &TimerEvent) -> bool {
        let slot = match event.kind {
            TimerKind::Idle => &self.idle,
            TimerKind::SuccessDisplay => &self.success,
        };
        slot.as_ref()
            .map_or(false, |task| task.generation == event.generation)
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        match kind {
            TimerKind::Idle => self.idle.is_some(),
            TimerKind::SuccessDisplay => self.success.is_some(),
        }
    }

    pub fn cancel_all(&mut self) {
        self.idle = None;
        self.success = None;
    }

    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> ScheduledTask {
        self.next_generation += 1;
        let generation = self.next_generation;
        // Deadline is fixed now, not when the task is first polled
        let deadline = Instant::now() + delay;
        let events = self.events.clone();

        debug!("Arming {:?} timer #{} for {:?}", kind, generation, delay);
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = events.send(TimerEvent { kind, generation });
        });

        ScheduledTask { generation, handle }
    }
}
