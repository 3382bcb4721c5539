//! Trailing-edge debounce for bursts of layout-change triggers.
//!
//! # Invariants
//! - At most one pending trigger exists; a new trigger replaces its payload and
//!   restarts the quiet window.
//! - Only the payload of the last trigger in a burst is ever released.

/// Collapses bursts of triggers into one release per quiet period.
#[derive(Debug, Clone)]
pub struct DebounceScheduler<T> {
    quiet_ms: u64,
    pending: Option<PendingTrigger<T>>,
}

#[derive(Debug, Clone)]
struct PendingTrigger<T> {
    due_ms: u64,
    payload: T,
    coalesced: u32,
}

/// Payload released once the quiet window elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub payload: T,
    /// Number of triggers collapsed into this release (at least 1).
    pub coalesced: u32,
}

impl<T> DebounceScheduler<T> {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            pending: None,
        }
    }

    pub fn quiet_ms(&self) -> u64 {
        self.quiet_ms
    }

    /// Changes the window; an already pending trigger keeps its due time.
    pub fn set_quiet_ms(&mut self, quiet_ms: u64) {
        self.quiet_ms = quiet_ms;
    }

    /// Records a trigger at `now_ms`, canceling and restarting any pending one.
    ///
    /// Returns `true` when a pending trigger was replaced.
    pub fn trigger(&mut self, now_ms: u64, payload: T) -> bool {
        let due_ms = now_ms.saturating_add(self.quiet_ms);
        match self.pending.as_mut() {
            Some(pending) => {
                pending.due_ms = due_ms;
                pending.payload = payload;
                pending.coalesced = pending.coalesced.saturating_add(1);
                true
            }
            None => {
                self.pending = Some(PendingTrigger {
                    due_ms,
                    payload,
                    coalesced: 1,
                });
                false
            }
        }
    }

    /// Releases the pending payload when its quiet window has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Option<Fired<T>> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.due_ms <= now_ms);
        if !due {
            return None;
        }
        self.pending.take().map(|pending| Fired {
            payload: pending.payload,
            coalesced: pending.coalesced,
        })
    }

    /// Drops the pending trigger. Returns `true` when one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due_at(&self) -> Option<u64> {
        self.pending.as_ref().map(|pending| pending.due_ms)
    }
}
