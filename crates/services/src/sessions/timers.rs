//! Cancellable one-shot timers injected into the session controller.
//!
//! The controller only ever asks for a timer and later hears back the id that
//! fired through `SessionController::on_timer`. Hosts decide how time passes:
//! tests drive `ManualTimers` by hand, the terminal app uses `TokioTimers`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle for a scheduled timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({})", self.0)
    }
}

/// Scheduler contract for delayed session transitions.
pub trait Timers {
    /// Schedule a one-shot timer; the returned id is reported back on expiry.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Cancel a pending timer. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

//
// ─── MANUAL ────────────────────────────────────────────────────────────────────
//

/// Deterministic timers that only fire when the caller says so.
#[derive(Debug, Default)]
pub struct ManualTimers {
    next_id: u64,
    pending: Vec<(TimerId, Duration)>,
    cancelled: usize,
}

impl ManualTimers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers scheduled and not yet fired or cancelled, oldest first.
    #[must_use]
    pub fn pending(&self) -> &[(TimerId, Duration)] {
        &self.pending
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|(pending, _)| *pending == id)
    }

    /// Number of `cancel` calls that hit a pending timer.
    #[must_use]
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    /// Fire every pending timer, returning their ids in schedule order.
    pub fn take_due(&mut self) -> Vec<TimerId> {
        self.pending.drain(..).map(|(id, _)| id).collect()
    }
}

impl Timers for ManualTimers {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push((id, delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != id);
        if self.pending.len() != before {
            self.cancelled += 1;
        }
    }
}

//
// ─── TOKIO ─────────────────────────────────────────────────────────────────────
//

/// Timers backed by `tokio::time::sleep`; expired ids arrive on a channel.
///
/// Must be used from within a Tokio runtime.
pub struct TokioTimers {
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    fired: mpsc::UnboundedSender<TimerId>,
}

impl TokioTimers {
    /// Create the timers together with the receiver of fired ids.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerId>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let timers = Self {
            next_id: 0,
            tasks: HashMap::new(),
            fired,
        };
        (timers, rx)
    }
}

impl Timers for TokioTimers {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.tasks.retain(|_, task| !task.is_finished());
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let fired = self.fired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired.send(id);
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timers_fire_on_demand() {
        let mut timers = ManualTimers::new();
        let a = timers.schedule(Duration::from_millis(10));
        let b = timers.schedule(Duration::from_millis(20));
        timers.cancel(a);
        timers.cancel(a);

        assert!(!timers.is_pending(a));
        assert_eq!(timers.cancelled(), 1);
        assert_eq!(timers.take_due(), vec![b]);
        assert!(timers.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timers_deliver_fired_ids() {
        let (mut timers, mut fired) = TokioTimers::new();
        let slow = timers.schedule(Duration::from_secs(5));
        let fast = timers.schedule(Duration::from_secs(1));

        assert_eq!(fired.recv().await, Some(fast));
        assert_eq!(fired.recv().await, Some(slow));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_tokio_timer_never_fires() {
        let (mut timers, mut fired) = TokioTimers::new();
        let cancelled = timers.schedule(Duration::from_secs(1));
        let kept = timers.schedule(Duration::from_secs(2));
        timers.cancel(cancelled);

        assert_eq!(fired.recv().await, Some(kept));
    }
}
