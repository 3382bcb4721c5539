//! Delayed task queue released by caller-supplied time.

use std::collections::BTreeMap;

/// Insertion sequence; breaks ties between tasks due at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TimerId(u64);

#[derive(Debug, Clone)]
struct Scheduled<T> {
    due_ms: u64,
    task: T,
}

/// Tasks keyed by timer id, released in `(due_ms, id)` order once due.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: BTreeMap<TimerId, Scheduled<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to become due `delay_ms` after `now_ms`.
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, task: T) {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Scheduled {
                due_ms: now_ms.saturating_add(delay_ms),
                task,
            },
        );
    }

    /// Removes and returns every task due at `now_ms`.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut due: Vec<(u64, TimerId)> = self
            .entries
            .iter()
            .filter(|(_, scheduled)| scheduled.due_ms <= now_ms)
            .map(|(id, scheduled)| (scheduled.due_ms, *id))
            .collect();
        due.sort();

        due.into_iter()
            .filter_map(|(_, id)| self.entries.remove(&id))
            .map(|scheduled| scheduled.task)
            .collect()
    }

    /// Earliest due time among pending tasks.
    pub fn next_due(&self) -> Option<u64> {
        self.entries.values().map(|scheduled| scheduled.due_ms).min()
    }

    /// Cancels everything, returning the number of dropped tasks.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::TimerQueue;

    #[test]
    fn releases_tasks_in_due_order() {
        let mut queue = TimerQueue::new();
        queue.schedule(0, 300, "late");
        queue.schedule(0, 100, "early");
        queue.schedule(50, 50, "tied");

        assert!(queue.take_due(99).is_empty());
        assert_eq!(queue.take_due(100), vec!["early", "tied"]);
        assert_eq!(queue.next_due(), Some(300));
        assert_eq!(queue.take_due(1_000), vec!["late"]);
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn zero_delay_is_due_immediately() {
        let mut queue = TimerQueue::new();
        queue.schedule(42, 0, ());
        assert_eq!(queue.take_due(42).len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = TimerQueue::new();
        queue.schedule(0, 10, 1);
        queue.schedule(0, 20, 2);
        assert_eq!(queue.clear(), 2);
        assert!(queue.take_due(u64::MAX).is_empty());
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let mut queue = TimerQueue::new();
        queue.schedule(u64::MAX - 1, 10, ());
        assert_eq!(queue.next_due(), Some(u64::MAX));
    }
}
