//! Execution history shared between the status listener and the UI thread.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::types::NodeId;

/// One parsed status message: the node IDs reported as executed, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusUpdate {
    pub executed: Vec<NodeId>,
}

/// Ordered record of node IDs in the order the runner executed them.
///
/// Bounded: once `capacity` entries are held, appending drops the oldest
/// entry, keeping the listener non-blocking and the recent tail intact,
/// which is what the UI actually renders.
#[derive(Debug)]
pub struct ExecutionHistory {
    entries: VecDeque<NodeId>,
    capacity: usize,
}

impl ExecutionHistory {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, id: NodeId) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(id);
    }

    pub fn extend(&mut self, ids: &[NodeId]) {
        for &id in ids {
            self.push(id);
        }
    }

    /// Copy of the current history; callers read a snapshot, never the
    /// live buffer.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NodeId> {
        self.entries.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State shared across the owner/listener concurrency boundary.
///
/// The history mutex serializes the listener's appends against the owner's
/// snapshot reads. The repaint flag
/// is a one-shot boolean with a benign race: a spurious or missed repaint
/// is a staleness artifact bounded by the next UI poll, never a correctness
/// violation.
#[derive(Debug)]
pub struct SessionShared {
    history: Mutex<ExecutionHistory>,
    repaint: AtomicBool,
    alive: AtomicBool,
}

impl SessionShared {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: Mutex::new(ExecutionHistory::with_capacity(history_capacity)),
            repaint: AtomicBool::new(false),
            alive: AtomicBool::new(false),
        }
    }

    /// Append executed node IDs under the status lock.
    pub fn push_executed(&self, ids: &[NodeId]) {
        self.history.lock().expect("status lock poisoned").extend(ids);
    }

    /// Snapshot copy of the execution history.
    #[must_use]
    pub fn history_snapshot(&self) -> Vec<NodeId> {
        self.history
            .lock()
            .expect("status lock poisoned")
            .snapshot()
    }

    pub fn clear_history(&self) {
        self.history.lock().expect("status lock poisoned").clear();
    }

    pub fn set_history_capacity(&self, capacity: usize) {
        self.history
            .lock()
            .expect("status lock poisoned")
            .set_capacity(capacity);
    }

    /// Mark that the graph changed in a way that warrants a redraw.
    pub fn request_repaint(&self) {
        self.repaint.store(true, Ordering::Relaxed);
    }

    /// Consume the repaint flag. Called by the UI's poll cycle.
    pub fn take_repaint(&self) -> bool {
        self.repaint.swap(false, Ordering::Relaxed)
    }

    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Release);
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_appends_in_order() {
        let mut history = ExecutionHistory::with_capacity(10);
        history.extend(&[NodeId(3), NodeId(7), NodeId(12)]);
        assert_eq!(history.snapshot(), vec![NodeId(3), NodeId(7), NodeId(12)]);
    }

    #[test]
    fn history_drops_oldest_on_overflow() {
        let mut history = ExecutionHistory::with_capacity(3);
        history.extend(&[NodeId(1), NodeId(2), NodeId(3), NodeId(4)]);
        assert_eq!(history.snapshot(), vec![NodeId(2), NodeId(3), NodeId(4)]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn repaint_flag_is_one_shot() {
        let shared = SessionShared::new(10);
        assert!(!shared.take_repaint());
        shared.request_repaint();
        assert!(shared.take_repaint());
        assert!(!shared.take_repaint());
    }
}
