use crate::error::ParsePriorityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

// Shared by every scheduler in the process so ids never repeat.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique, monotonically increasing task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// All priorities, in dequeue order.
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    pub(crate) fn tier(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ParsePriorityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "normal" => Ok(Priority::Normal),
            "low" => Ok(Priority::Low),
            _ => Err(ParsePriorityError(s.to_string())),
        }
    }
}

/// Conversion from whatever a task closure returns into the executor's result type.
/// Lets callers hand over plain `|| { ... }` closures as well as fallible ones.
pub trait IntoTaskResult {
    fn into_task_result(self) -> anyhow::Result<()>;
}

impl IntoTaskResult for () {
    fn into_task_result(self) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<E> IntoTaskResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_task_result(self) -> anyhow::Result<()> {
        self.map_err(Into::into)
    }
}

pub(crate) type TaskAction = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// A unit of deferred work. The action is consumed when it runs, so it can run at most once.
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    pub(crate) enqueued_at: Instant,
    pub(crate) action: TaskAction,
}

impl Task {
    pub fn new<F, R>(priority: Priority, enqueued_at: Instant, action: F) -> Self
    where
        F: FnOnce() -> R + 'static,
        R: IntoTaskResult,
    {
        Self {
            id: TaskId::next(),
            priority,
            enqueued_at,
            action: Box::new(move || action().into_task_result()),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}
