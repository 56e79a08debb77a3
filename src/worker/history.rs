// ABOUTME: Bounded per-worker attempt history with lifetime statistics
// ABOUTME: Keeps the most recent results in a ring buffer while totals survive eviction

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::contract::WorkerResult;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<WorkerResult>,
    capacity: usize,
    total_attempts: u64,
    successes: u64,
    total_execution_time: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub attempts: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub average_execution_time: Duration,
}

impl History {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            total_attempts: 0,
            successes: 0,
            total_execution_time: Duration::ZERO,
        }
    }

    pub fn record(&mut self, result: WorkerResult) {
        self.total_attempts += 1;
        if result.is_successful() {
            self.successes += 1;
        }
        self.total_execution_time += result.execution_time;

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recent `limit` results, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<WorkerResult> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn attempts_for(&self, task_id: &str) -> usize {
        self.entries.iter().filter(|r| r.task_id == task_id).count()
    }

    pub fn stats(&self) -> HistoryStats {
        if self.total_attempts == 0 {
            return HistoryStats {
                attempts: 0,
                successes: 0,
                success_rate: 0.0,
                average_execution_time: Duration::ZERO,
            };
        }

        let average_nanos = self.total_execution_time.as_nanos() / u128::from(self.total_attempts);

        HistoryStats {
            attempts: self.total_attempts,
            successes: self.successes,
            success_rate: self.successes as f64 / self.total_attempts as f64,
            average_execution_time: Duration::from_nanos(average_nanos as u64),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_attempts = 0;
        self.successes = 0;
        self.total_execution_time = Duration::ZERO;
    }
}
