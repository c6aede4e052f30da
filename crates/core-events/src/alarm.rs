//! One-shot timer heap (spec component C4, spec.md §4.4).
//!
//! Grounded on `original_source/evnt.c`'s `Alrm[MaxAlrms]` array and
//! `addalrm`/`popalrm`. The original stores the heap 1-indexed and its
//! `popalrm` sift-down has a known off-by-one that can read past the live
//! length (spec.md §9, REDESIGN FLAGS). This is a plain 0-indexed binary
//! min-heap over a fixed-capacity `Vec`; sift-down never considers a
//! child index `>= len`.

use tracing::trace;

/// `original_source/evnt.c`'s `MaxAlrms`.
pub const MAX_ALARMS: usize = 15;

pub type AlarmCallback = Box<dyn FnMut()>;

struct Entry {
    deadline_ms: u64,
    callback: AlarmCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("alarm queue is full")]
pub struct AlarmQueueFull;

/// A bounded binary min-heap of alarms keyed by deadline.
#[derive(Default)]
pub struct AlarmHeap {
    entries: Vec<Entry>,
}

impl AlarmHeap {
    pub fn new() -> Self {
        AlarmHeap { entries: Vec::with_capacity(MAX_ALARMS) }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_ALARMS
    }

    /// Deadline of the next alarm to fire, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.first().map(|e| e.deadline_ms)
    }

    pub fn push(&mut self, deadline_ms: u64, callback: AlarmCallback) -> Result<(), AlarmQueueFull> {
        if self.is_full() {
            return Err(AlarmQueueFull);
        }
        self.entries.push(Entry { deadline_ms, callback });
        let mut i = self.entries.len() - 1;
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.entries[parent].deadline_ms <= self.entries[i].deadline_ms {
                break;
            }
            self.entries.swap(parent, i);
            i = parent;
        }
        trace!(target: "events.alarm", deadline_ms, len = self.entries.len(), "alarm_scheduled");
        Ok(())
    }

    /// Pop and return the callback with the smallest deadline, if any.
    fn pop(&mut self) -> Option<AlarmCallback> {
        if self.entries.is_empty() {
            return None;
        }
        let len = self.entries.len();
        self.entries.swap(0, len - 1);
        let top = self.entries.pop().expect("checked non-empty above");
        self.sift_down(0);
        Some(top.callback)
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < len && self.entries[left].deadline_ms < self.entries[smallest].deadline_ms {
                smallest = left;
            }
            if right < len && self.entries[right].deadline_ms < self.entries[smallest].deadline_ms {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.entries.swap(i, smallest);
            i = smallest;
        }
    }

    /// Fire every alarm whose deadline has passed `now_ms`, in deadline
    /// order, removing each as it fires.
    pub fn fire_due(&mut self, now_ms: u64) {
        loop {
            match self.next_deadline() {
                Some(d) if d <= now_ms => {
                    if let Some(mut cb) = self.pop() {
                        trace!(target: "events.alarm", now_ms, deadline_ms = d, "alarm_fired");
                        cb();
                    }
                }
                _ => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn pops_in_deadline_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut heap = AlarmHeap::new();
        for d in [50u64, 10, 30, 20, 40] {
            let order = order.clone();
            heap.push(d, Box::new(move || order.borrow_mut().push(d))).unwrap();
        }
        heap.fire_due(u64::MAX);
        assert_eq!(*order.borrow(), vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn full_heap_at_max_alarms_pops_all_in_order_without_reading_past_len() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut heap = AlarmHeap::new();
        let deadlines: Vec<u64> = (0..MAX_ALARMS as u64).rev().collect();
        for &d in &deadlines {
            let order = order.clone();
            heap.push(d, Box::new(move || order.borrow_mut().push(d))).unwrap();
        }
        assert!(heap.is_full());
        assert_eq!(heap.push(999, Box::new(|| {})), Err(AlarmQueueFull));
        heap.fire_due(u64::MAX);
        let mut expected = deadlines;
        expected.sort_unstable();
        assert_eq!(*order.borrow(), expected);
        assert!(heap.is_empty());
    }

    #[test]
    fn fire_due_only_fires_past_deadlines() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut heap = AlarmHeap::new();
        for d in [10u64, 20, 30] {
            let order = order.clone();
            heap.push(d, Box::new(move || order.borrow_mut().push(d))).unwrap();
        }
        heap.fire_due(15);
        assert_eq!(*order.borrow(), vec![10]);
        assert_eq!(heap.len(), 2);
    }
}
