//! Bounded FIFO history of analysis runs.
//!
//! A fixed-capacity ring of `Arc<AnalysisRun>` with a single write
//! cursor. One writer (the analysis loop) and many readers (API
//! handlers) share it; access is serialized by a mutex held only long
//! enough to move Arcs, and readers always receive point-in-time
//! snapshots rather than references into the live buffer.

use corrsight_core::events::AnalysisRun;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Ring {
    slots: Vec<Option<Arc<AnalysisRun>>>,
    /// Next slot to write; advances modulo capacity
    cursor: usize,
    len: usize,
}

/// Thread-safe bounded history of recent analysis runs
#[derive(Debug)]
pub struct AnalysisHistory {
    inner: Mutex<Ring>,
    capacity: usize,
}

impl AnalysisHistory {
    /// Create a history retaining at most `capacity` runs
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            inner: Mutex::new(Ring {
                slots: vec![None; capacity],
                cursor: 0,
                len: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a run, evicting the oldest when full
    pub fn push(&self, run: AnalysisRun) {
        let mut ring = self.inner.lock().expect("history mutex poisoned");
        let cursor = ring.cursor;
        ring.slots[cursor] = Some(Arc::new(run));
        ring.cursor = (cursor + 1) % self.capacity;
        if ring.len < self.capacity {
            ring.len += 1;
        }
    }

    /// Number of retained runs
    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent run, if any
    pub fn latest(&self) -> Option<Arc<AnalysisRun>> {
        let ring = self.inner.lock().expect("history mutex poisoned");
        if ring.len == 0 {
            return None;
        }
        let newest = (ring.cursor + self.capacity - 1) % self.capacity;
        ring.slots[newest].clone()
    }

    /// The last `n` runs in ascending (oldest-first) order
    pub fn recent(&self, n: usize) -> Vec<Arc<AnalysisRun>> {
        let ring = self.inner.lock().expect("history mutex poisoned");
        let take = n.min(ring.len);
        let mut out = Vec::with_capacity(take);
        // Oldest retained run sits at cursor - len (mod capacity)
        let oldest = (ring.cursor + self.capacity - ring.len) % self.capacity;
        for i in (ring.len - take)..ring.len {
            let idx = (oldest + i) % self.capacity;
            if let Some(run) = &ring.slots[idx] {
                out.push(run.clone());
            }
        }
        out
    }
}
