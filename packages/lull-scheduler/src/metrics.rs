use crate::executor::TaskOutcome;
use serde::Serialize;
use std::time::Duration;

/// Point-in-time counters for one scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerMetrics {
    pub pending_tasks: usize,
    pub total_tasks_executed: u64,
    pub total_tasks_failed: u64,
    pub tasks_cleared: u64,
    pub slots_requested: u64,
    pub slots_granted: u64,
    /// Mean time between enqueue and start of execution.
    pub average_latency_ms: f64,
    pub average_execution_ms: f64,
}

#[derive(Debug, Default)]
pub(crate) struct MetricsRecorder {
    executed: u64,
    failed: u64,
    cleared: u64,
    slots_requested: u64,
    slots_granted: u64,
    total_latency: Duration,
    total_execution: Duration,
}

impl MetricsRecorder {
    pub(crate) fn record_outcome(&mut self, outcome: &TaskOutcome) {
        self.executed += 1;
        if outcome.result.is_err() {
            self.failed += 1;
        }
        self.total_latency += outcome.queued_for;
        self.total_execution += outcome.elapsed;
    }

    pub(crate) fn record_cleared(&mut self, discarded: usize) {
        self.cleared += discarded as u64;
    }

    pub(crate) fn record_slot_requested(&mut self) {
        self.slots_requested += 1;
    }

    pub(crate) fn record_slot_granted(&mut self) {
        self.slots_granted += 1;
    }

    pub(crate) fn snapshot(&self, pending_tasks: usize) -> SchedulerMetrics {
        let mean_ms = |total: Duration| {
            if self.executed == 0 {
                0.0
            } else {
                total.as_secs_f64() * 1000.0 / self.executed as f64
            }
        };
        SchedulerMetrics {
            pending_tasks,
            total_tasks_executed: self.executed,
            total_tasks_failed: self.failed,
            tasks_cleared: self.cleared,
            slots_requested: self.slots_requested,
            slots_granted: self.slots_granted,
            average_latency_ms: mean_ms(self.total_latency),
            average_execution_ms: mean_ms(self.total_execution),
        }
    }
}
