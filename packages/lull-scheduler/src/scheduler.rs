use crate::budget::Budget;
use crate::clock::{Clock, SystemClock};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::{TaskExecutor, TaskObserver};
use crate::metrics::{MetricsRecorder, SchedulerMetrics};
use crate::provider::{HostCapabilities, HostSlotProvider, IdleSlotProvider, ProviderKind};
use crate::queue::TaskQueue;
use crate::task::{IntoTaskResult, Priority, Task, TaskId};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Nothing pending, no slot requested.
    Idle,
    /// Work pending, waiting for the host to grant a slot.
    WaitingForSlot,
    /// Running tasks inside a granted slot.
    Draining,
}

struct LoopState {
    mode: SchedulerState,
    queue: TaskQueue,
    // A registration handed to the provider that has not fired yet.
    // Survives clear_tasks, so the next schedule_task reuses it instead of registering again.
    slot_outstanding: bool,
    metrics: MetricsRecorder,
}

impl LoopState {
    /// Returns true when the caller must issue a new slot request.
    fn arm(&mut self) -> bool {
        if self.slot_outstanding {
            return false;
        }
        self.slot_outstanding = true;
        self.metrics.record_slot_requested();
        true
    }

    fn transition(&mut self, to: SchedulerState) {
        if self.mode != to {
            tracing::debug!(from = ?self.mode, to = ?to, "Scheduler state change");
            self.mode = to;
        }
    }
}

struct Inner {
    state: RefCell<LoopState>,
    provider: Box<dyn IdleSlotProvider>,
    executor: TaskExecutor,
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
}

enum Step {
    Run(Task),
    Rearm,
    Stop,
}

/// Handle to a single-threaded cooperative scheduler.
///
/// Cloning is cheap and every clone drives the same queue, so the handle can be passed to
/// whatever code wants to defer work, including the deferred tasks themselves.
/// Work only runs inside idle slots granted by the provider; each slot is drained
/// until the queue is empty or the slot's budget is spent, then the loop re-arms.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    pub fn new<P>(provider: P, config: SchedulerConfig) -> Result<Self, SchedulerError>
    where
        P: IdleSlotProvider + 'static,
    {
        Self::with_clock(provider, Rc::new(SystemClock), config)
    }

    pub fn with_clock<P>(
        provider: P,
        clock: Rc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError>
    where
        P: IdleSlotProvider + 'static,
    {
        config.validate()?;
        Ok(Self {
            inner: Rc::new(Inner {
                state: RefCell::new(LoopState {
                    mode: SchedulerState::Idle,
                    queue: TaskQueue::with_discipline(config.discipline),
                    slot_outstanding: false,
                    metrics: MetricsRecorder::default(),
                }),
                provider: Box::new(provider),
                executor: TaskExecutor::new(clock.clone()),
                clock,
                config,
            }),
        })
    }

    /// Probes the host for an idle mechanism and builds a scheduler on top of it.
    /// Fails with `ProviderUnavailable` when the host has neither idle callbacks nor timers.
    pub fn from_host(
        capabilities: &HostCapabilities,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        let provider = HostSlotProvider::probe(capabilities, &config)?;
        Self::with_clock(provider, capabilities.clock(), config)
    }

    /// Attaches an extra outcome observer next to the default tracing one.
    pub fn with_observer(self, observer: impl TaskObserver + 'static) -> Self {
        self.inner.executor.add_observer(Rc::new(observer));
        self
    }

    /// Queues `action` at normal priority.
    pub fn schedule<F, R>(&self, action: F) -> TaskId
    where
        F: FnOnce() -> R + 'static,
        R: IntoTaskResult,
    {
        self.schedule_task(action, Priority::Normal)
    }

    /// Queues `action`. Always enqueues; only asks the provider for a slot when the
    /// scheduler was idle, so there is never more than one drain chain in flight.
    /// Safe to call from inside a running task.
    pub fn schedule_task<F, R>(&self, action: F, priority: Priority) -> TaskId
    where
        F: FnOnce() -> R + 'static,
        R: IntoTaskResult,
    {
        let task = Task::new(priority, self.inner.clock.now(), action);
        let id = task.id();

        let request = {
            let mut state = self.inner.state.borrow_mut();
            state.queue.enqueue(task);
            tracing::trace!(task = %id, %priority, pending = state.queue.len(), "Task enqueued");

            if state.mode == SchedulerState::Idle {
                state.transition(SchedulerState::WaitingForSlot);
                state.arm()
            } else {
                false
            }
        };

        if request {
            self.request_slot();
        }
        id
    }

    /// Drops all pending work and returns to Idle. A task that is currently running
    /// finishes normally; the drain stops after it. Returns how many tasks were dropped.
    pub fn clear_tasks(&self) -> usize {
        let mut state = self.inner.state.borrow_mut();
        let discarded = state.queue.clear();
        state.metrics.record_cleared(discarded);
        state.transition(SchedulerState::Idle);
        tracing::info!(discarded, "Pending tasks cleared");
        discarded
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.state.borrow().mode
    }

    pub fn is_idle(&self) -> bool {
        self.state() == SchedulerState::Idle
    }

    pub fn pending(&self) -> usize {
        self.inner.state.borrow().queue.len()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        let state = self.inner.state.borrow();
        state.metrics.snapshot(state.queue.len())
    }

    pub fn provider_kind(&self) -> ProviderKind {
        self.inner.provider.kind()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    fn request_slot(&self) {
        // Weak, so a slot firing after the last handle is dropped does nothing.
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        tracing::trace!(provider = %self.inner.provider.kind(), "Requesting idle slot");
        self.inner
            .provider
            .request_idle_slot(Box::new(move |budget: &dyn Budget| {
                if let Some(inner) = weak.upgrade() {
                    Scheduler { inner }.on_slot(budget);
                }
            }));
    }

    fn on_slot(&self, budget: &dyn Budget) {
        {
            let mut state = self.inner.state.borrow_mut();
            state.slot_outstanding = false;
            state.metrics.record_slot_granted();

            let mode = state.mode;
            match mode {
                SchedulerState::WaitingForSlot => state.transition(SchedulerState::Draining),
                SchedulerState::Idle => {
                    // Queue was cleared after the request went out.
                    tracing::debug!("Idle slot granted with nothing to do");
                    return;
                }
                SchedulerState::Draining => {
                    tracing::warn!("Idle slot granted while already draining, ignoring");
                    return;
                }
            }

            tracing::debug!(
                pending = state.queue.len(),
                budget_ms = budget.time_remaining().as_secs_f64() * 1000.0,
                "Idle slot granted"
            );
        }

        self.drain(budget);
    }

    fn drain(&self, budget: &dyn Budget) {
        let mut executed = 0usize;

        loop {
            // Poll the budget before borrowing; it belongs to the host.
            let remaining = budget.time_remaining();

            let step = {
                let mut state = self.inner.state.borrow_mut();
                if state.mode != SchedulerState::Draining {
                    // clear_tasks ran inside the last task (and maybe new work re-armed).
                    Step::Stop
                } else if state.queue.is_empty() {
                    state.transition(SchedulerState::Idle);
                    tracing::debug!(executed, "Queue drained");
                    Step::Stop
                } else if remaining.is_zero() {
                    state.transition(SchedulerState::WaitingForSlot);
                    tracing::debug!(
                        executed,
                        pending = state.queue.len(),
                        "Idle budget exhausted, re-arming"
                    );
                    if state.arm() { Step::Rearm } else { Step::Stop }
                } else {
                    match state.queue.dequeue_highest_priority() {
                        Some(task) => Step::Run(task),
                        None => Step::Stop,
                    }
                }
            };

            match step {
                Step::Run(task) => {
                    let outcome = self.inner.executor.execute(task);
                    self.inner
                        .state
                        .borrow_mut()
                        .metrics
                        .record_outcome(&outcome);
                    executed += 1;
                }
                Step::Rearm => {
                    self.request_slot();
                    break;
                }
                Step::Stop => break,
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Scheduler")
            .field("state", &state.mode)
            .field("pending", &state.queue.len())
            .field("provider", &self.inner.provider.kind())
            .finish()
    }
}
