//! Single-slot deferral primitives driven by the host shell.
//!
//! Nothing here owns a timer. The shell reports the current time and host
//! events; these types only remember the latest pending request.

use std::time::{Duration, Instant};

/// Holds at most one pending request; scheduling replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSlot<T> {
    pending: Option<T>,
}

impl<T> Default for PendingSlot<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> PendingSlot<T> {
    /// Creates an empty slot.
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Stores a request, returning the one it superseded.
    pub fn schedule(&mut self, request: T) -> Option<T> {
        self.pending.replace(request)
    }

    /// Removes and returns the pending request.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Returns the pending request.
    #[must_use]
    pub const fn peek(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// True if a request is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the pending request.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }
}

/// Coalesces rapid requests: only the latest survives, and it fires once the
/// window has passed since it was scheduled.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    slot: PendingSlot<(Instant, T)>,
}

impl<T> Debouncer<T> {
    /// Creates a debouncer with the given quiet window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            slot: PendingSlot::new(),
        }
    }

    /// Quiet window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Schedules a request at `now`, restarting the window.
    ///
    /// Returns the superseded request, if any.
    pub fn schedule(&mut self, now: Instant, request: T) -> Option<T> {
        self.slot.schedule((now, request)).map(|(_, old)| old)
    }

    /// Returns the pending request if its window has elapsed at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self
            .slot
            .peek()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) >= self.window);
        if due {
            self.slot.take().map(|(_, request)| request)
        } else {
            None
        }
    }

    /// Time at which the pending request becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.slot.peek().map(|(at, _)| *at + self.window)
    }

    /// True if a request is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }

    /// Drops the pending request.
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.cancel().map(|(_, request)| request)
    }
}

/// Result of submitting a request to a [`LockdownGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<T> {
    /// The host allows it; run now
    Ready(T),
    /// Held until the lockdown lifts (any earlier held request was dropped)
    Deferred,
}

/// Holds back one request while the host forbids mutating calls.
#[derive(Debug, Clone)]
pub struct LockdownGate<T> {
    locked: bool,
    slot: PendingSlot<T>,
}

impl<T> Default for LockdownGate<T> {
    fn default() -> Self {
        Self {
            locked: false,
            slot: PendingSlot::new(),
        }
    }
}

impl<T> LockdownGate<T> {
    /// Creates an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the host is in lockdown.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Submits a request.
    pub fn submit(&mut self, request: T) -> GateDecision<T> {
        if self.locked {
            self.slot.schedule(request);
            GateDecision::Deferred
        } else {
            GateDecision::Ready(request)
        }
    }

    /// Host entered lockdown.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Host left lockdown; returns the held request to run now.
    pub fn unlock(&mut self) -> Option<T> {
        self.locked = false;
        self.slot.take()
    }

    /// The held request, if any.
    #[must_use]
    pub const fn pending(&self) -> Option<&T> {
        self.slot.peek()
    }

    /// Drops the held request.
    pub fn cancel(&mut self) -> Option<T> {
        self.slot.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_slot_last_writer_wins() {
        let mut slot = PendingSlot::new();
        assert_eq!(slot.schedule(1), None);
        assert_eq!(slot.schedule(2), Some(1));
        assert_eq!(slot.take(), Some(2));
        assert!(!slot.is_pending());
    }

    #[test]
    fn test_debouncer_fires_latest_after_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        debouncer.schedule(start, "a");
        let superseded = debouncer.schedule(start + Duration::from_millis(100), "b");
        assert_eq!(superseded, Some("a"));

        // Window restarts from the latest request
        assert_eq!(debouncer.poll(start + Duration::from_millis(550)), None);
        assert_eq!(
            debouncer.deadline(),
            Some(start + Duration::from_millis(600))
        );
        assert_eq!(debouncer.poll(start + Duration::from_millis(600)), Some("b"));
        assert_eq!(debouncer.poll(start + Duration::from_millis(700)), None);
    }

    #[test]
    fn test_debouncer_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.schedule(start, 1);
        assert_eq!(debouncer.cancel(), Some(1));
        assert_eq!(debouncer.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_lockdown_gate_holds_latest() {
        let mut gate = LockdownGate::new();
        assert_eq!(gate.submit(10), GateDecision::Ready(10));

        gate.lock();
        assert_eq!(gate.submit(20), GateDecision::Deferred);
        assert_eq!(gate.submit(30), GateDecision::Deferred);
        assert_eq!(gate.pending(), Some(&30));

        assert_eq!(gate.unlock(), Some(30));
        assert!(!gate.is_locked());
        assert_eq!(gate.unlock(), None);
    }
}
