use crate::clock::Clock;
use crate::error::TaskExecutionError;
use crate::task::{Priority, Task, TaskId};
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

/// What happened to one task. The task itself is gone by the time this exists.
#[derive(Debug)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub priority: Priority,
    /// Time spent waiting in the queue.
    pub queued_for: Duration,
    /// Wall time of the action itself.
    pub elapsed: Duration,
    pub result: Result<(), TaskExecutionError>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&TaskExecutionError> {
        self.result.as_ref().err()
    }
}

/// Receives every task outcome. The scheduler never reports outcomes back to producers.
pub trait TaskObserver {
    fn on_outcome(&self, outcome: &TaskOutcome);
}

impl<F> TaskObserver for F
where
    F: Fn(&TaskOutcome),
{
    fn on_outcome(&self, outcome: &TaskOutcome) {
        self(outcome)
    }
}

/// Default observer: one log line per task.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TaskObserver for TracingObserver {
    fn on_outcome(&self, outcome: &TaskOutcome) {
        let elapsed_ms = outcome.elapsed.as_secs_f64() * 1000.0;
        match &outcome.result {
            Ok(()) => tracing::debug!(
                task = %outcome.id,
                priority = %outcome.priority,
                elapsed_ms,
                "Task executed"
            ),
            Err(err) => tracing::error!(
                task = %outcome.id,
                priority = %outcome.priority,
                elapsed_ms,
                error = %err,
                "Task failed"
            ),
        }
    }
}

/// Runs tasks one at a time, turning errors and panics into outcomes.
pub struct TaskExecutor {
    clock: Rc<dyn Clock>,
    observers: RefCell<Vec<Rc<dyn TaskObserver>>>,
}

impl TaskExecutor {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        let tracing: Rc<dyn TaskObserver> = Rc::new(TracingObserver);
        Self {
            clock,
            observers: RefCell::new(vec![tracing]),
        }
    }

    /// Executor with no observers attached, not even the tracing one.
    pub fn silent(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn add_observer(&self, observer: Rc<dyn TaskObserver>) {
        self.observers.borrow_mut().push(observer);
    }

    pub fn execute(&self, task: Task) -> TaskOutcome {
        let Task {
            id,
            priority,
            enqueued_at,
            action,
        } = task;

        let started = self.clock.now();
        let result = match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(TaskExecutionError::Failed { id, source }),
            Err(payload) => Err(TaskExecutionError::Panicked {
                id,
                message: panic_message(&*payload),
            }),
        };
        let finished = self.clock.now();

        let outcome = TaskOutcome {
            id,
            priority,
            queued_for: started.saturating_duration_since(enqueued_at),
            elapsed: finished.saturating_duration_since(started),
            result,
        };

        // Snapshot so an observer may attach another observer without a borrow conflict.
        let observers = self.observers.borrow().clone();
        for observer in observers {
            // A broken observer must not unwind into the drain loop.
            if let Err(payload) =
                panic::catch_unwind(AssertUnwindSafe(|| observer.on_outcome(&outcome)))
            {
                tracing::error!(
                    task = %outcome.id,
                    panic = %panic_message(&*payload),
                    "Task observer panicked"
                );
            }
        }
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
