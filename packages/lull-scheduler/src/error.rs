use crate::task::TaskId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The host offers neither idle callbacks nor timers, so nothing could ever run.
    #[error("no idle-slot provider available: host offers neither idle callbacks nor timers")]
    ProviderUnavailable,

    #[error("invalid scheduler config: {0}")]
    Config(String),
}

/// Failure of a single task. Reported to observers, never returned to whoever scheduled it.
#[derive(Debug, Error)]
pub enum TaskExecutionError {
    #[error("task {id} failed: {source:#}")]
    Failed {
        id: TaskId,
        #[source]
        source: anyhow::Error,
    },

    #[error("task {id} panicked: {message}")]
    Panicked { id: TaskId, message: String },
}

impl TaskExecutionError {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskExecutionError::Failed { id, .. } | TaskExecutionError::Panicked { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown priority `{0}` (expected high, normal or low)")]
pub struct ParsePriorityError(pub String);
