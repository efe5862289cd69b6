// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Delayed one-shot tasks, polled by the simulation's own ticks

use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::debug;

/// Work that runs once its fire time has passed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// Remove an emergency alert
    ClearAlert(String),
    /// Return a malfunctioning device to service
    RepairDevice(String),
}

#[derive(Debug)]
struct ScheduledTask {
    fire_at: DateTime<Utc>,
    seq: u64,
    task: DeferredTask,
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for ScheduledTask {}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at.cmp(&other.fire_at).then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of tasks keyed by fire time.
///
/// Tasks with equal fire times come out in scheduling order. Nothing fires
/// on its own: the owner calls `pop_due` with its clock's current time.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    heap: BinaryHeap<Reverse<ScheduledTask>>,
    next_seq: u64,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_at: DateTime<Utc>, task: DeferredTask) {
        debug!("Deferred {:?} until {}", task, fire_at);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(ScheduledTask { fire_at, seq, task }));
    }

    /// Remove and return every task due at `now`, earliest first
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<DeferredTask> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.fire_at > now {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push(entry.task);
            }
        }
        due
    }

    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(entry)| entry.fire_at)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_pop_due_in_time_order() {
        let now = Utc::now();
        let mut queue = DeferredQueue::new();
        queue.schedule(now + Duration::seconds(30), DeferredTask::RepairDevice("b".into()));
        queue.schedule(now + Duration::seconds(10), DeferredTask::ClearAlert("a".into()));
        queue.schedule(now + Duration::seconds(90), DeferredTask::ClearAlert("c".into()));

        assert!(queue.pop_due(now).is_empty());
        assert_eq!(queue.next_fire_time(), Some(now + Duration::seconds(10)));

        let due = queue.pop_due(now + Duration::seconds(30));
        assert_eq!(
            due,
            vec![DeferredTask::ClearAlert("a".into()), DeferredTask::RepairDevice("b".into())]
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_equal_fire_times_keep_schedule_order() {
        let at = Utc::now();
        let mut queue = DeferredQueue::new();
        for id in ["x", "y", "z"] {
            queue.schedule(at, DeferredTask::ClearAlert(id.into()));
        }
        let due = queue.pop_due(at);
        assert_eq!(
            due,
            vec![
                DeferredTask::ClearAlert("x".into()),
                DeferredTask::ClearAlert("y".into()),
                DeferredTask::ClearAlert("z".into()),
            ]
        );
        assert!(queue.is_empty());
    }
}
