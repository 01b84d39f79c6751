//! A fixed-capacity min-heap keyed by next-eligible instant, storing
//! instruction ids.
//!
//! The heap never loses members once seeded: popping re-keys the root to a
//! future instant and sifts it down, so cooldown is modeled as "re-push with
//! a later timestamp" in one atomic step and the size stays constant for a
//! given scheduler.

use anyhow::{bail, Result};
use tokio::time::Instant;

#[derive(Debug)]
struct Node {
    ts: Instant,
    value: String,
}

#[derive(Debug)]
pub struct TimestampHeap {
    nodes: Vec<Node>,
    capacity: usize,
}

impl TimestampHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.nodes.iter().any(|node| node.value == value)
    }

    /// Inserts a value keyed by `ts`. Exceeding the fixed capacity is the
    /// fatal resource error from the failure model.
    pub fn push(&mut self, ts: Instant, value: impl Into<String>) -> Result<()> {
        if self.nodes.len() >= self.capacity {
            bail!("timestamp heap is at capacity ({})", self.capacity);
        }

        self.nodes.push(Node {
            ts,
            value: value.into(),
        });
        self.sift_up(self.nodes.len() - 1);
        Ok(())
    }

    /// The id at the root, i.e. the earliest-eligible member.
    pub fn peek_value(&self) -> Option<&str> {
        self.nodes.first().map(|node| node.value.as_str())
    }

    /// The instant the earliest member comes due.
    pub fn peek_ts(&self) -> Option<Instant> {
        self.nodes.first().map(|node| node.ts)
    }

    /// True iff the heap is non-empty and the minimum has come due.
    pub fn can_pop(&self) -> bool {
        match self.nodes.first() {
            Some(root) => Instant::now() >= root.ts,
            None => false,
        }
    }

    /// Re-keys the root to `new_ts`, restores the heap order, and returns
    /// the value that was at the root. The member stays in the heap.
    pub fn pop(&mut self, new_ts: Instant) -> Result<String> {
        if self.nodes.is_empty() {
            bail!("attempted to pop from an empty timestamp heap");
        }

        let value = self.nodes[0].value.clone();
        self.nodes[0].ts = new_ts;
        self.sift_down(0);
        Ok(value)
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.nodes[idx].ts >= self.nodes[parent].ts {
                break;
            }
            self.nodes.swap(idx, parent);
            idx = parent;
        }
    }

    // Equal keys sink below their peers, so a re-keyed root rotates behind
    // members sharing its timestamp instead of popping again.
    fn sift_down(&mut self, mut idx: usize) {
        let len = self.nodes.len();
        loop {
            let left = idx * 2 + 1;
            let right = idx * 2 + 2;
            let mut min_idx = idx;

            if left < len && self.nodes[left].ts <= self.nodes[min_idx].ts {
                min_idx = left;
            }
            if right < len && self.nodes[right].ts < self.nodes[min_idx].ts {
                min_idx = right;
            }
            if min_idx == idx {
                break;
            }
            self.nodes.swap(idx, min_idx);
            idx = min_idx;
        }
    }

    #[cfg(test)]
    fn is_heap_ordered(&self) -> bool {
        (1..self.nodes.len()).all(|idx| self.nodes[(idx - 1) / 2].ts <= self.nodes[idx].ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_push_orders_by_timestamp() {
        let now = Instant::now();
        let mut heap = TimestampHeap::new(8);

        heap.push(now + Duration::from_millis(30), "c").unwrap();
        heap.push(now + Duration::from_millis(10), "a").unwrap();
        heap.push(now + Duration::from_millis(20), "b").unwrap();

        assert_eq!(heap.peek_value(), Some("a"));
        assert_eq!(heap.peek_ts(), Some(now + Duration::from_millis(10)));
        assert!(heap.is_heap_ordered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_overflow_is_an_error() {
        let now = Instant::now();
        let mut heap = TimestampHeap::new(1);

        heap.push(now, "a").unwrap();
        assert!(heap.push(now, "b").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_can_pop_requires_expiry() {
        let now = Instant::now();
        let mut heap = TimestampHeap::new(4);
        heap.push(now + Duration::from_millis(100), "a").unwrap();

        assert!(!heap.can_pop());

        tokio::time::advance(Duration::from_millis(99)).await;
        assert!(!heap.can_pop());

        // The boundary counts as due.
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(heap.can_pop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_can_pop_on_empty() {
        let heap = TimestampHeap::new(4);
        assert!(!heap.can_pop());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_rekeys_in_place() {
        let now = Instant::now();
        let mut heap = TimestampHeap::new(4);
        heap.push(now, "a").unwrap();
        heap.push(now + Duration::from_millis(50), "b").unwrap();

        let popped = heap.pop(now + Duration::from_millis(200)).unwrap();
        assert_eq!(popped, "a");

        // Nothing was removed; "a" moved behind "b".
        assert_eq!(heap.len(), 2);
        assert!(heap.contains("a"));
        assert_eq!(heap.peek_value(), Some("b"));
        assert!(heap.is_heap_ordered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_empty_is_an_error() {
        let mut heap = TimestampHeap::new(4);
        assert!(heap.pop(Instant::now()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_keys_rotate() {
        let now = Instant::now();
        let mut heap = TimestampHeap::new(4);
        heap.push(now, "a").unwrap();
        heap.push(now, "b").unwrap();

        // Re-keying to the same instant moves the popped member behind its
        // equal-key peer.
        assert_eq!(heap.pop(now).unwrap(), "a");
        assert_eq!(heap.pop(now).unwrap(), "b");
        assert_eq!(heap.pop(now).unwrap(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_over_many_pops() {
        let now = Instant::now();
        let mut heap = TimestampHeap::new(4);
        for (offset, value) in [(0u64, "a"), (1, "b"), (2, "c")] {
            heap.push(now + Duration::from_millis(offset), value).unwrap();
        }

        let mut seen = Vec::new();
        for round in 1..=6u64 {
            tokio::time::advance(Duration::from_millis(10)).await;
            let next = Instant::now() + Duration::from_millis(100 * round);
            seen.push(heap.pop(next).unwrap());
            assert!(heap.is_heap_ordered());
        }

        // Each member pops exactly twice across two full rotations.
        for value in ["a", "b", "c"] {
            assert_eq!(seen.iter().filter(|v| v.as_str() == value).count(), 2);
        }
        assert_eq!(heap.len(), 3);
    }
}
